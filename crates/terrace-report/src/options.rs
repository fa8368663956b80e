#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub color: ColorChoice,
    /// Also list the documents an order was built from.
    pub verbose: bool,
    /// Path shown next to the command in the text header.
    pub target: Option<String>,
    /// Module path shown in the header when not the root module.
    pub module: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color: ColorChoice::Auto,
            verbose: false,
            target: None,
            module: None,
        }
    }
}
