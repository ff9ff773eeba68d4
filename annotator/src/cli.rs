use annotation_engine::ContainerKey;
use clap::{Parser, Subcommand};
use content_tree::{AnnotationId, AnnotationStyle};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "annotator")]
#[command(about = "Apply, list and replay durable highlights over a markup document")]
#[command(version)]
pub struct Cli {
    /// Directory holding saved annotations and settings.json
    #[arg(long, value_name = "DIR", default_value = ".annotations")]
    pub store: PathBuf,

    /// Container key (`document` or `document/section`); defaults to the
    /// markup file's stem
    #[arg(long, value_name = "KEY")]
    pub key: Option<ContainerKey>,

    /// Source markup of the container
    pub markup: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List saved annotations and whether they were restored
    List,
    /// Highlight the text between two character offsets
    Apply {
        start: usize,
        end: usize,
        #[arg(long, default_value = "highlight")]
        style: AnnotationStyle,
    },
    /// Remove an annotation
    Remove { id: AnnotationId },
    /// Change the style of an annotation
    Restyle { id: AnnotationId, style: AnnotationStyle },
    /// Save the word(s) between two offsets to the glossary
    Glossary { start: usize, end: usize },
    /// Print the container as HTML with annotations applied
    Render,
}
