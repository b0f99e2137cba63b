use std::env;

use color_eyre::eyre::{OptionExt, Result, eyre};

#[derive(Debug, PartialEq)]
pub enum Command {
    /// Print one page of the transaction feed, optionally filtered.
    Transactions { query: String, page: usize },
    /// Replay a transfer actions file and print the completed receipts.
    Transfer { actions_file_path: String },
}

pub struct CliArgs {
    pub command: Command,
}

impl CliArgs {
    pub fn load() -> Result<Self> {
        let args: Vec<String> = env::args().skip(1).collect();

        Self::parse(&args)
    }

    pub fn parse(args: &[String]) -> Result<Self> {
        let name = args.first().ok_or_eyre("Command not passed")?;

        let command = match name.as_str() {
            "transactions" => {
                let query = args.get(1).cloned().unwrap_or_default();
                let page = match args.get(2) {
                    Some(raw) => raw
                        .parse()
                        .map_err(|e| eyre!("Invalid page {}: {}", raw, e))?,
                    None => 1,
                };
                Command::Transactions { query, page }
            }
            "transfer" => Command::Transfer {
                actions_file_path: args.get(1).ok_or_eyre("Actions file not passed")?.to_owned(),
            },
            other => return Err(eyre!("Unknown command: {}", other)),
        };

        Ok(CliArgs { command })
    }
}
