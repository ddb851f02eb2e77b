//! Run the pipeline over an input file.

use anyhow::{Result, bail};
use clap::Parser;
use factpipe_lib::pipeline::Pipeline;
use factpipe_lib::validation::validate_file_exists;
use log::{debug, info};

use crate::commands::command::Command;
use crate::commands::common::ConfigOptions;

/// Compute the factorial of every line of a file, in order.
#[derive(Debug, Parser)]
#[command(
    name = "run",
    about = "Compute factorials for each line of an input file, preserving line order",
    long_about = r#"
Read one integer per line, compute each factorial on a pool of worker threads
under a global rate limit, and write "<n> = <n!>" lines in the original order.

Malformed lines (empty, not an integer, negative) are reported as
"Line <n>: [<text>] -> <reason>" in the errors file. If the errors file is the
same as the output file, the raw malformed lines are written into the output
at their original position instead.

The input is followed while it grows: reading stops once it has not grown for
--follow-idle-ms milliseconds. A file that shrinks is read again from the start.

Settings are read from --config (or ./factpipe.toml if present); flags
override the file.

EXAMPLES:

  # Read input.txt once, four workers
  factpipe run -i input.txt -o output.txt -e errors.txt -t 4 -f 0

  # Follow a growing file, merge diagnostics into the output
  factpipe run -i live.txt -o out.txt -e out.txt --follow-idle-ms 5000
"#
)]
pub struct Run {
    #[command(flatten)]
    pub options: ConfigOptions,
}

impl Command for Run {
    fn execute(&self, command_line: &str) -> Result<()> {
        debug!("Command line: {command_line}");
        let config = self.options.resolve()?;
        validate_file_exists(&config.input_path, "Input")?;

        info!(
            "Input: {} | output: {} | errors: {}",
            config.input_path.display(),
            config.output_path.display(),
            config.errors_path.display()
        );

        let summary = Pipeline::new(config).run()?;
        println!("{summary}");

        if let Some(e) = &summary.reader_error {
            bail!("reading input failed: {e}");
        }
        if let Some(e) = &summary.writer_error {
            bail!("writing output failed: {e}");
        }
        Ok(())
    }
}
