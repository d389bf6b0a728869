//! 高斯混合阈值分割消融实验.
//!
//! + `gmm8`: 在 `$MRI_BERRY_DATA_DIR` (或 `$HOME/dataset/scd`) 数据集上比较不同的分割参数;
//! + `gmm8 case <image> <inner.txt> <outer.txt> [k] [--dilate] [--save <dir>]`: 评估单张切片.

mod profile;
mod result;
mod runner;

use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::process::ExitCode;

const USAGE: &str = "usage: gmm8 [case <image> <inner.txt> <outer.txt> [k] [--dilate] [--save <dir>]]";

fn main() -> ExitCode {
    if let Err(e) = SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
    {
        eprintln!("logger: {e}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = match args.first().map(String::as_str) {
        None => runner::run().and_then(|r| r.analyze().map_err(Into::into)),
        Some("case") => runner::run_case(&args[1..]),
        Some(_) => Err(mri_berry::BerryError::InvalidInput(USAGE.into())),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
