use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use color_eyre::Result;
use crossterm::style::{Color, Stylize};
use engine::{
    Config, SYSTEM_PROMPT, config,
    image_model::{ModelDescriptor, replicate::Replicate},
    inference::InferenceProvider,
    orchestrator::{self, Progress, Tally},
    queue,
};
use log::debug;

use crate::cli::Cli;

pub mod cli;
pub mod display;
pub mod prompt;

pub async fn run(args: Cli) -> Result<()> {
    if args.list_models {
        println!("{}", display::models_table());
        return Ok(());
    }

    let config = Config::load(Config::project_root()?)?;
    config.load_dotenv();
    let model = args.model.descriptor();
    debug!("Project root {}, model {}", config.root.display(), model.id);

    println!("{}\n", display::banner(&model));

    let api_key = config::api_key()?;
    let provider = Replicate::new(api_key, &config);
    let folders = queue::list_queue_folders(&config)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    interactive(&config, &provider, &model, &folders, &mut input, &mut out).await
}

/// Folder menu, processing and the closing summary.
pub async fn interactive(
    config: &Config,
    provider: &dyn InferenceProvider,
    model: &ModelDescriptor,
    folders: &[PathBuf],
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    if folders.is_empty() {
        writeln!(out, "{}", "No folders found in the queue.".yellow())?;
        writeln!(out, "{}", "Exiting...".dim())?;
        return Ok(());
    }

    let rows = folders
        .iter()
        .enumerate()
        .map(|(i, folder)| {
            let count = queue::list_images(config, folder)?.len();
            Ok(vec![
                (i + 1).to_string(),
                queue::file_name(folder),
                count.to_string(),
            ])
        })
        .collect::<Result<Vec<_>>>()?;
    writeln!(
        out,
        "{}\n",
        display::table("Available Folders in Queue", &["#", "Folder Name", "Images"], &rows)
    )?;

    let Some(choice) = prompt::select_folder(input, out, folders.len())? else {
        writeln!(out, "{}", "Exiting...".dim())?;
        return Ok(());
    };
    let folder = &folders[choice];
    let folder_name = queue::file_name(folder);

    let images = queue::list_images(config, folder)?;
    writeln!(out, "\n{}", format!("Selected: {folder_name}").bold())?;
    writeln!(out, "Contains {} image(s)", images.len())?;

    if !prompt::confirm(input, out, "Proceed with processing?")? {
        writeln!(out, "{}", "Cancelled.".dim())?;
        return Ok(());
    }

    let tally = process(config, provider, model, folder, images.len(), out).await?;
    writeln!(out)?;
    summarize(config, folder, tally, input, out)
}

async fn process(
    config: &Config,
    provider: &dyn InferenceProvider,
    model: &ModelDescriptor,
    folder: &Path,
    image_count: usize,
    out: &mut impl Write,
) -> Result<Tally> {
    if image_count > 0 {
        writeln!(
            out,
            "\n{}\n",
            format!(
                "Processing {image_count} image(s) from '{}' using {}",
                queue::file_name(folder),
                model.name
            )
            .bold()
        )?;
    } else {
        let msg = format!("No images found in {}", queue::file_name(folder));
        writeln!(out, "{}", msg.yellow())?;
    }

    let mut report_err = None;
    let tally = orchestrator::process_folder(
        config,
        provider,
        folder,
        model,
        SYSTEM_PROMPT,
        &mut |progress| {
            let line = match progress {
                Progress::Started {
                    image,
                    index,
                    total,
                } => format!("Processing {image} ({index}/{total})...").stylize(),
                Progress::Completed { image, output_name } => {
                    format!("Completed: {image} -> {output_name}").green()
                }
                Progress::Failed { image, error } => {
                    format!("Failed: {image} ({error})").red()
                }
            };
            if let Err(e) = writeln!(out, "{line}") {
                report_err.get_or_insert(e);
            }
        },
    )
    .await?;

    if let Some(e) = report_err {
        return Err(e.into());
    }
    Ok(tally)
}

fn summarize(
    config: &Config,
    folder: &Path,
    tally: Tally,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    let Tally { success, total } = tally;

    if tally.all_succeeded() {
        let enhanced = config.enhanced_dir().join(queue::file_name(folder));
        let lines = [
            format!("Successfully processed all {total} image(s)!"),
            format!("Enhanced images saved to: {}", enhanced.display()),
        ];
        writeln!(out, "{}", display::panel(Some("Complete"), &lines, Color::Green))?;

        if prompt::confirm(input, out, "Move original folder to 'processed'?")? {
            let new_location = queue::move_to_processed(config, folder)?;
            writeln!(
                out,
                "{}",
                format!("Moved to: {}", new_location.display()).dim()
            )?;
        }
    } else if success > 0 {
        let lines = [
            format!("Processed {success}/{total} image(s)"),
            "Some images failed. Check the output above for details.".to_string(),
        ];
        writeln!(
            out,
            "{}",
            display::panel(Some("Partial Success"), &lines, Color::Yellow)
        )?;
    } else {
        let lines = [
            "Failed to process any images".to_string(),
            "Check your API key and try again.".to_string(),
        ];
        writeln!(out, "{}", display::panel(Some("Failed"), &lines, Color::Red))?;
    }
    Ok(())
}
