use color_eyre::Result;
use engine::{
    Config, Model, SYSTEM_PROMPT, config,
    image_model::{ModelDescriptor, replicate::Replicate},
};

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;

    let config = Config::load(Config::project_root()?)?;
    config.load_dotenv();

    let rule = "=".repeat(60);
    println!("{rule}\nWhiteboard Enhancement Model Evaluation\n{rule}");

    let api_key = match config::api_key() {
        Ok(key) => key,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let provider = Replicate::new(api_key, &config);
    let models: Vec<ModelDescriptor> = Model::all().collect();

    if let Err(e) = engine::eval::run(
        &config,
        &provider,
        &models,
        SYSTEM_PROMPT,
        &mut std::io::stdout(),
    )
    .await
    {
        eprintln!("{e}");
        std::process::exit(1);
    }
    Ok(())
}
