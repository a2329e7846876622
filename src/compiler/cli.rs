use clap::{App, Arg};
use io::Read;
use std::fmt;
use std::fs;
use std::io;
use std::iter::ExactSizeIterator;
use std::str::FromStr;

use super::CompilerError;
use crate::syntax::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn variants() -> impl Iterator<Item = OutputFormat> {
        vec![Self::Text, Self::Json].into_iter()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::variants()
            .find(|x| x.to_string() == s)
            .ok_or_else(|| format!("Unknown format option: `{}`", s))
    }
}

#[derive(Debug)]
pub struct CompilerOptions {
    format: OutputFormat,
    module: String,
    filepath: Option<String>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            module: "main".to_string(),
            filepath: None,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn filepath(&self) -> Option<&str> {
        self.filepath.as_deref()
    }
}

#[derive(Debug, Default)]
pub struct Command {}

impl Command {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(
        &self,
        args: impl ExactSizeIterator<Item = String>,
    ) -> Result<String, CompilerError> {
        let options = parse_options(args)?;

        let src = if let Some(filepath) = options.filepath() {
            read_from_file(filepath)?
        } else {
            read_from_stdin()?
        };

        let document: Document = serde_json::from_str(&src)?;
        let report = super::bind(&document, options.module())?;

        match options.format() {
            OutputFormat::Text => Ok(report.to_string()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&report)? + "\n"),
        }
    }
}

pub fn parse_options(
    args: impl ExactSizeIterator<Item = String>,
) -> Result<CompilerOptions, CompilerError> {
    let mut options = CompilerOptions::new();

    let format_possible_values = OutputFormat::variants()
        .map(|b| b.to_string())
        .collect::<Vec<_>>();
    let format_possible_values: Vec<&str> =
        format_possible_values.iter().map(AsRef::as_ref).collect();

    let matches = App::new("ember")
        .about("Binds a JSON syntax tree and reports its types")
        .arg(
            Arg::with_name("format")
                .long("format")
                .takes_value(true)
                .possible_values(&format_possible_values),
        )
        .arg(
            Arg::with_name("module")
                .long("module")
                .takes_value(true)
                .help("Name of the module type"),
        )
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the input document to use")
                .required(false)
                .index(1),
        )
        .get_matches_from(args);

    if let Some(format) = matches.value_of("format") {
        options.format = format.parse::<OutputFormat>()?;
    }

    if let Some(module) = matches.value_of("module") {
        if module.is_empty() {
            return Err(CompilerError::InvalidOption(
                "module name must not be empty".to_string(),
            ));
        }
        options.module = module.to_string();
    }

    if let Some(filepath) = matches.value_of("INPUT") {
        options.filepath = Some(filepath.to_string());
    }

    Ok(options)
}

fn read_from_stdin() -> Result<String, io::Error> {
    let mut content = String::new();

    io::stdin().read_to_string(&mut content)?;

    Ok(content)
}

fn read_from_file(filename: &str) -> io::Result<String> {
    fs::read_to_string(filename)
}
