use std::path::PathBuf;

use clap::Parser;

/// A template-driven build and materialization tool for warehouse
/// tables: expands resource descriptors, infers their dependency graph
/// by lexical SQL inspection, and drives a poll-based executor to
/// create or refresh each target in order.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Folders scanned non-recursively for descriptor files.
    pub folders: Vec<PathBuf>,

    /// Run the executor against the warehouse.
    #[arg(long)]
    pub execute: bool,

    /// Print the materialization order without touching the warehouse.
    #[arg(long)]
    pub show: bool,

    /// Emit a Graphviz `digraph` of the dependency graph.
    #[arg(long)]
    pub dotml: bool,

    /// Like `--show`, but also write each resource's rendered definition
    /// into this folder.
    #[arg(long = "dumpToFolder", value_name = "DIR")]
    pub dump_to_folder: Option<PathBuf>,

    /// Print the resources that currently have a warehouse job running.
    #[arg(long = "showJobs")]
    pub show_jobs: bool,

    /// Print the fully-resolved global bindings and exit.
    #[arg(long = "print-global-args")]
    pub print_global_args: bool,

    /// Injects `KEY=VALUE` into the global bindings; highest precedence.
    /// Repeatable. A value starting with `[` parses as a JSON array; a
    /// value starting with `file:` is replaced by that file's contents.
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub var: Vec<String>,

    /// YAML or JSON map merged into the global bindings below `--var`
    /// and above `--defaultProject`/`--defaultDataset`.
    #[arg(long = "varsFile", value_name = "PATH")]
    pub vars_file: Option<PathBuf>,

    #[arg(long = "defaultProject", default_value = "")]
    pub default_project: String,

    #[arg(long = "defaultDataset")]
    pub default_dataset: Option<String>,

    #[arg(long = "maxConcurrent", default_value_t = 10)]
    pub max_concurrent: usize,

    #[arg(long = "maxRetry", default_value_t = 2)]
    pub max_retry: u32,

    #[arg(long = "checkFrequency", default_value_t = 10)]
    pub check_frequency_secs: u64,

    #[arg(long = "bqClientLocation", default_value = "US")]
    pub bq_client_location: String,

    /// Freezes the date used for all relative date offsets; ISO-8601.
    /// Defaults to today.
    #[arg(long = "effective-date-as-isoformat", value_name = "ISO")]
    pub effective_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Execute,
    Show,
    Dotml,
    Dump,
    ShowJobs,
    PrintGlobalArgs,
}

impl Cli {
    /// Resolves which of the mutually-exclusive mode flags was passed.
    /// `None` means "print help" — the documented default when no mode
    /// selector is given.
    pub fn mode(&self) -> Result<Option<Mode>, String> {
        let mut selected = Vec::new();
        if self.execute {
            selected.push(Mode::Execute);
        }
        if self.show {
            selected.push(Mode::Show);
        }
        if self.dotml {
            selected.push(Mode::Dotml);
        }
        if self.dump_to_folder.is_some() {
            selected.push(Mode::Dump);
        }
        if self.show_jobs {
            selected.push(Mode::ShowJobs);
        }
        if self.print_global_args {
            selected.push(Mode::PrintGlobalArgs);
        }

        match selected.len() {
            0 => Ok(None),
            1 => Ok(Some(selected[0])),
            _ => Err("only one of --execute/--show/--dotml/--dumpToFolder/--showJobs/--print-global-args may be given".to_string()),
        }
    }
}
