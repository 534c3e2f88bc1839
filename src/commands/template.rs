//! Template command implementation
//!
//! Like `copy`, but every text file is rendered with the given context and
//! destination paths are always expanded. Binary files are copied verbatim.

use anyhow::Result;
use clap::Args;
use serde_json::{Map, Value};
use stagecopy::{Editor, TemplateSettings};

use super::copy::CopyArgs;
use super::{absolute, finish, load_context, source_from_args};

/// Arguments for the template command
#[derive(Args, Debug)]
pub struct TemplateArgs {
    #[command(flatten)]
    pub copy: CopyArgs,

    /// Tag character, e.g. `?` for `<?= name ?>`
    #[arg(long, value_name = "CHAR", default_value_t = '%')]
    pub delimiter: char,

    /// Opening character of a tag
    #[arg(long, value_name = "CHAR", default_value_t = '<')]
    pub open_delimiter: char,

    /// Closing character of a tag
    #[arg(long, value_name = "CHAR", default_value_t = '>')]
    pub close_delimiter: char,
}

impl TemplateArgs {
    fn settings(&self) -> TemplateSettings {
        TemplateSettings {
            open_delimiter: self.open_delimiter,
            delimiter: self.delimiter,
            close_delimiter: self.close_delimiter,
        }
    }
}

/// Execute the template command
pub fn execute(args: TemplateArgs) -> Result<()> {
    let settings = args.settings();
    let options = args.copy.options().template_settings(settings);
    let context = load_context(args.copy.context.as_deref(), &args.copy.set)?
        .unwrap_or_else(|| Value::Object(Map::new()));

    let to = absolute(&args.copy.to);
    let mut editor = Editor::new();
    editor.copy_tpl(source_from_args(args.copy.from), &to, Some(&context), &options)?;

    finish(editor.into_store(), args.copy.dry_run, args.copy.quiet)
}
