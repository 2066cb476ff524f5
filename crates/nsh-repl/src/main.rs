//! nsh entry point.
//!
//! Interactive shell:
//! ```bash
//! cargo run -p nsh-repl
//! ```
//!
//! One line, then exit with its status:
//! ```bash
//! nsh -c 'ls /bin | wc -l'
//! ```

use anyhow::{Result, bail};
use nsh_kernel::KernelConfig;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let config = KernelConfig::from_env().with_name("nsh");
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => nsh_repl::run(config),
        [flag, line] if flag == "-c" => {
            let code = nsh_repl::run_command(config, line)?;
            std::process::exit(i32::try_from(code).unwrap_or(1));
        }
        _ => bail!("usage: nsh [-c COMMAND]"),
    }
}
