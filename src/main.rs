use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{value_parser, Arg, ArgAction, Command};
use log::{debug, error, info};

use modextract::extract::wav::WavEncoder;
use modextract::extract::{extract_samples, ExtractSummary};
use modextract::format::protracker::info::{info_instruments, info_title};
use modextract::format::protracker::ProtrackerMod;
use modextract::ModError;

fn build_cli() -> Command {
    Command::new("modextract")
        .about("extract samples from .mod files.")
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .help("Module files to extract; samples are written to the current directory")
                .required(true)
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf)),
        )
}

fn process_file(path: &Path, encoder: &mut WavEncoder) -> Result<ExtractSummary, ModError> {
    let mut f = File::open(path).map_err(ModError::Open)?;
    let module = ProtrackerMod::open(&mut f)?;

    info!("{}", info_title(&path.to_string_lossy(), &module.header));
    debug!("instruments:\n{}", info_instruments(&module.header));

    Ok(extract_samples(&mut f, &module, path, encoder))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let matches = build_cli().get_matches();
    let mut encoder = WavEncoder::new(".");

    let mut has_err = false;
    for path in matches.get_many::<PathBuf>("file").into_iter().flatten() {
        match process_file(path, &mut encoder) {
            Ok(summary) => debug!("{}: {:?}", path.display(), summary),
            Err(e) => {
                error!("{}: {}", path.display(), e);
                has_err = true;
            }
        }
    }

    if has_err {
        error!("exiting with failure due to previous errors.");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_accepts_many_files() {
        let matches = build_cli()
            .try_get_matches_from(["modextract", "a.mod", "b.mod"])
            .unwrap();
        let files: Vec<_> = matches.get_many::<PathBuf>("file").unwrap().collect();
        assert_eq!(files, [&PathBuf::from("a.mod"), &PathBuf::from("b.mod")]);
    }

    #[test]
    fn cli_requires_a_file() {
        assert!(build_cli().try_get_matches_from(["modextract"]).is_err());
    }
}
