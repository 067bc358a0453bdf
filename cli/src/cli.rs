use engine::Model;

/// Transform whiteboard photos into clean, professional diagrams
#[derive(Debug, clap::Parser)]
#[command(name = "whiteboard", version)]
pub struct Cli {
    /// Model to use for processing
    #[arg(short, long, value_enum, default_value_t = Model::default())]
    pub model: Model,

    /// List available models and exit
    #[arg(long)]
    pub list_models: bool,
}
