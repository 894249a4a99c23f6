use std::fs::File;
use std::io::BufReader;

use quasselwire_frame::{FrameError, FrameReader};
use quasselwire_types::{Adapter, Decoder, SemanticValue, TypeRegistry};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_value, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let path = args.file.display().to_string();
    let file = File::open(&args.file).map_err(|err| io_error(&format!("open {path}"), err))?;
    let registry = TypeRegistry::quassel();
    let adapter = Adapter::quassel();

    let mut failed = 0usize;
    for (index, frame) in FrameReader::new(BufReader::new(file)).enumerate() {
        let payload = match frame {
            Ok(payload) => payload,
            Err(FrameError::ConnectionClosed) => {
                return Err(CliError::new(
                    DATA_INVALID,
                    format!("{path}: capture ends inside frame {index}"),
                ))
            }
            Err(err) => return Err(frame_error(&format!("{path}: frame {index}"), err)),
        };
        match decode(&registry, &adapter, &payload, args.max_depth) {
            Ok(value) => print_value(index, payload.len(), &value, format),
            Err(reason) => {
                failed += 1;
                tracing::warn!(frame = index, size = payload.len(), "undecodable frame");
                eprintln!("frame {index}: {reason}");
            }
        }
    }

    if failed > 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

fn decode(
    registry: &TypeRegistry,
    adapter: &Adapter,
    payload: &[u8],
    max_depth: usize,
) -> Result<SemanticValue, String> {
    let mut decoder = Decoder::new(registry, payload).with_max_depth(max_depth);
    let variant = decoder.read_variant().map_err(|err| err.to_string())?;
    decoder.finish().map_err(|err| err.to_string())?;
    adapter.project(&variant).map_err(|err| err.to_string())
}
