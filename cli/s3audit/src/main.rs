//! s3audit CLI
//!
//! Audits S3 buckets for existence, region, per-identity permissions and,
//! on request, dumps their contents.

use clap::Parser;
use sa_scanner::format_bytes;

mod args;
mod run;

use args::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Initialize logging (to stderr, so stdout is clean for result lines)
    run::init_logging(args.log_level)?;

    let has_errors = match &args.command {
        Command::Scan { input, dangerous } => {
            let stats = run::execute_scan(&args, input, *dangerous).await?;

            eprintln!();
            eprintln!("Scan completed:");
            eprintln!("  Buckets scanned:  {}", stats.buckets_scanned);
            eprintln!("  Existing:         {}", stats.buckets_existing);
            eprintln!("  Not found:        {}", stats.buckets_not_found);
            eprintln!("  Invalid names:    {}", stats.invalid_names);
            eprintln!("  Errors:           {}", stats.errors.len());
            print_duration(stats.duration());

            for error in &stats.errors {
                eprintln!("  Error: {}", error);
            }
            stats.has_errors()
        }
        Command::Dump {
            input,
            dump_dir,
            downloads,
            verbose,
        } => {
            let stats = run::execute_dump(&args, input, dump_dir, *downloads, *verbose).await?;

            eprintln!();
            eprintln!("Dump completed:");
            eprintln!("  Buckets dumped:   {}", stats.buckets_dumped);
            eprintln!("  Buckets skipped:  {}", stats.buckets_skipped);
            eprintln!("  Objects written:  {}", stats.objects_downloaded);
            eprintln!("  Objects failed:   {}", stats.objects_failed);
            eprintln!("  Bytes written:    {}", format_bytes(stats.bytes_downloaded));
            print_duration(stats.duration());

            for error in &stats.errors {
                eprintln!("  Error: {}", error);
            }
            stats.has_errors()
        }
    };

    if has_errors {
        std::process::exit(4); // Partial failure
    }

    Ok(())
}

fn print_duration(duration: Option<chrono::Duration>) {
    if let Some(duration) = duration {
        eprintln!(
            "  Duration:         {:.2}s",
            duration.num_milliseconds() as f64 / 1000.0
        );
    }
}
