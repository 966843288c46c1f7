use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Persists grants and device codes and sweeps the expired ones")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,
    /// Run a single cleanup sweep, print the report and exit.
    #[arg(long)]
    pub once: bool,
}
