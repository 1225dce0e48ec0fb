use reticle::{exit_code, format_error};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = match reticle::run(&args).await {
        Ok(status) => {
            tracing::debug!(?status, "Finished");
            status.exit_code()
        }
        Err(err) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Error: {}", format_error(&err));
            }
            exit_code(&err)
        }
    };

    std::process::exit(code);
}
