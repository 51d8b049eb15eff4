#![deny(clippy::all)]
use std::process::exit;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, bail};
use color_eyre::owo_colors::OwoColorize;
use dialoguer::Confirm;
use mdl_cli::cli::commands::chapters::ChapterList;
use mdl_cli::cli::commands::download::Download;
use mdl_cli::cli::commands::search::SearchArgs;
use mdl_cli::cli::{Cli, Commands, get_sources};
use mdl_cli::error::CliError;
use mdl_cli::progress_bars::IndicatifProgressHandler;
use mdl_cli::settings::Settings;
use mdl_common::Manga;
use mdl_core::async_queue::ChapterOutcome;
use mdl_core::{Downloader, RunSummary};
use mdl_sources::prelude::SourceFeatures;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    env_logger::builder().format_timestamp(None).init();
    color_eyre::install()?;

    let mut settings = Settings::load()?;

    match &args.mode {
        Commands::Search(search) => search_manga(search).await?,
        Commands::Chapters(list) => list_chapters(list).await?,
        Commands::Download(download) => download_chapters(&args, download, &settings).await?,
        Commands::Sources => print_sources(),
        Commands::Settings { action } => action.apply(&mut settings)?,
    }

    Ok(())
}

async fn search_manga(search: &SearchArgs) -> Result<()> {
    let found = search.find(get_sources()).await?;

    if found.is_empty() {
        println!("{} \"{}\"", "No manga found for".bold().red(), search.term());
        return Ok(());
    }

    for (index, manga) in found.iter().enumerate() {
        print_manga(index + 1, manga);
    }

    Ok(())
}

async fn list_chapters(list: &ChapterList) -> Result<()> {
    let (manga, _, chapters) = list.resolve(get_sources()).await?;

    println!(
        "{} {}",
        manga.title.bold().green(),
        format!("({} chapters)", chapters.len()).bold()
    );
    for chapter in &chapters {
        println!(" - {}", chapter);
    }

    Ok(())
}

async fn download_chapters(args: &Cli, download: &Download, settings: &Settings) -> Result<()> {
    let (manga, source, chapters) = download.target.resolve(get_sources()).await?;
    let selected = download.select(chapters);

    if selected.is_empty() {
        return Err(CliError::NoChaptersSelected.into());
    }

    let options = args.download_options(settings);

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Download {} chapters of {} ({}) into {}?",
                selected.len().bold().blue(),
                manga.title.bold().green(),
                download.chapters,
                options.download_dir.display().bold().blue().italic()
            ))
            .wait_for_newline(true)
            .interact()?;

        if !confirmed {
            println!("{}", "Download cancelled".bold().blue());
            exit(0);
        }
    }

    let progress_handler = Arc::new(IndicatifProgressHandler::new(selected.len() as u64));
    let downloader = Downloader::new(options, None, Some(progress_handler))?;

    let summary = downloader.run(&manga, selected, source).await?;

    print_results(&summary);

    let failed = summary.failed().count();
    if failed > 0 {
        bail!("{} chapters failed to download", failed);
    }

    Ok(())
}

fn print_manga(position: usize, manga: &Manga) {
    println!(
        "{:>3}. {} {}\n     {} {}",
        position,
        manga.title.bold().green(),
        format!("[{}]", manga.source_id).purple(),
        manga.url.underline(),
        manga
            .latest_chapter
            .as_ref()
            .map(|latest| format!("(latest: {})", latest))
            .unwrap_or_default()
            .yellow()
    );
}

fn print_results(summary: &RunSummary) {
    println!(
        "{} {} {}",
        summary.downloaded().to_string().bold().blue(),
        "chapters".bold().blue(),
        "downloaded".bold()
    );

    if summary.skipped() > 0 {
        println!(
            "{} {}",
            summary.skipped().to_string().bold().green(),
            "chapters were already downloaded.".bold().green()
        );
    }

    if summary.empty() > 0 {
        println!(
            "{} {}",
            summary.empty().to_string().bold().yellow(),
            "chapters had no pages.".bold().yellow()
        );
    }

    for report in summary.failed() {
        if let ChapterOutcome::Failed { error } = &report.outcome {
            println!("{} {}", report.chapter.to_string().red().bold(), error.red());
        }
    }

    println!("{} {}", "Saved in".bold(), summary.manga_dir.display().bold().blue());
}

fn print_sources() {
    println!(
        "{}\n----------------",
        "Available Sources:".underline().bold().blue()
    );

    for source in get_sources().iter() {
        let mut features = Vec::with_capacity(3);
        let source_features = source.features();

        if source_features.contains(SourceFeatures::SEARCH) {
            features.push("Search");
        }

        if source_features.contains(SourceFeatures::CHAPTER_LIST) {
            features.push("Chapter List");
        }

        if source_features.contains(SourceFeatures::DOWNLOAD_HEADERS) {
            features.push("Download Headers");
        }

        println!(
            "{:<16} - {} {:?}",
            format!("[{}]", source.name()).bold().green(),
            "Available features:".bold().blue(),
            features,
        );
    }
}
