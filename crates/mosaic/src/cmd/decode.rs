use mosaic::destination;
use mosaic::frame::FrameDecoder;
use mosaic::NodeConfig;

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat, config: &NodeConfig) -> CliResult<i32> {
    let data = std::fs::read(&args.path)
        .map_err(|err| io_error(&format!("failed to read {}", args.path.display()), err))?;
    let chunk_size = usize::try_from(args.chunk_size).unwrap_or(usize::MAX);

    let mut decoder = FrameDecoder::new();
    let mut valid = 0usize;
    let mut invalid = 0usize;

    for chunk in data.chunks(chunk_size) {
        decoder.extend(chunk);
        while let Some(message) = decoder.next_message() {
            if message.valid {
                valid += 1;
            } else {
                invalid += 1;
                if !args.all {
                    continue;
                }
            }
            print_message(
                &message,
                &destination(&message.identifier),
                &config.frame_id,
                format,
            );
        }
    }

    eprintln!(
        "{} bytes: {valid} valid, {invalid} invalid, {} trailing",
        data.len(),
        decoder.buffered_len()
    );

    if !data.is_empty() && valid == 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("no valid frames in {}", args.path.display()),
        ));
    }
    Ok(SUCCESS)
}
