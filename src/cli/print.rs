use std::io::Write;

use serde::Serialize;

use crate::application::AppError;

pub fn print_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut *out, value)
        .map_err(|e| AppError::unexpected(format!("failed to render output: {e}")))?;
    writeln!(out)?;
    Ok(())
}
