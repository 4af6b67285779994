use std::io::IsTerminal;
use std::path::Path;

use clap::Parser;
use ctxref_composer::SearchResult;
use ctxref_composer::reference_for_result;
use ctxref_file_index::Cli;
use ctxref_file_index::Reporter;
use ctxref_file_index::run_main;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ctxref_file_index=warn,ctxref_composer=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();
    let reporter = StdioReporter {
        write_output_as_json: cli.json,
        write_references: cli.references,
        show_indices: cli.compute_indices && std::io::stdout().is_terminal(),
    };
    run_main(cli, reporter).await?;
    Ok(())
}

struct StdioReporter {
    write_output_as_json: bool,
    write_references: bool,
    show_indices: bool,
}

impl Reporter for StdioReporter {
    #[allow(clippy::print_stdout)]
    fn report_match(&self, result: &SearchResult) {
        if self.write_output_as_json {
            println!("{}", serde_json::to_string(result).unwrap_or_default());
        } else if self.write_references {
            println!("{}", reference_for_result(result).to_inline_markup());
        } else if self.show_indices
            && let Some(indices) = result.indices.as_deref()
        {
            // Indices are sorted, so one pass over the chars suffices.
            let mut indices = indices.iter().peekable();
            let mut line = String::new();
            for (i, c) in result.relative_path.chars().enumerate() {
                if indices.next_if(|&&next| next as usize == i).is_some() {
                    line.push_str("\x1b[1m");
                    line.push(c);
                    line.push_str("\x1b[0m");
                } else {
                    line.push(c);
                }
            }
            println!("{line}");
        } else {
            println!("{}", result.relative_path);
        }
    }

    #[allow(clippy::print_stdout)]
    fn warn_matches_truncated(&self, total_match_count: usize, shown_match_count: usize) {
        if self.write_output_as_json {
            let value = json!({"matches_truncated": true});
            println!("{value}");
        } else {
            eprintln!(
                "Warning: showing {shown_match_count} out of {total_match_count} results. Provide a more specific pattern or increase the --limit.",
            );
        }
    }

    fn warn_index_incomplete(&self, search_directory: &Path) {
        eprintln!(
            "Warning: {} is still being indexed; results may be incomplete.",
            search_directory.display()
        );
    }
}
