use crate::utils;
use serde::Deserialize;

const CONFIG_PATH: &str = "./data/terminal.json";

const DEFAULT_PROMPT_LABEL: &str = "visitor@portfolio:~$";
const DEFAULT_TUTORIAL_SPEED_MS: u32 = 35;
const DEFAULT_OUTPUT_SPEED_MS: u32 = 6;
const DEFAULT_TUTORIAL: [&str; 5] = [
    "Welcome! You found the terminal.^600",
    "This portfolio can be browsed like a tiny file system.^300",
    "Type `ls` to list the files and `cat <file>` to open one.^300",
    "Type `compgen` to list every command, and `man <command>` to learn about it.^300",
    "Press Shift+T with an empty prompt to hide or show this terminal.",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TerminalConfig {
    pub prompt_label: String,
    pub tutorial: Vec<String>,
    pub tutorial_speed_ms: u32,
    pub output_speed_ms: u32,
    /// Prefix for backend routes; empty means same origin.
    pub api_base: String,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            prompt_label: DEFAULT_PROMPT_LABEL.to_string(),
            tutorial: DEFAULT_TUTORIAL.iter().map(|line| line.to_string()).collect(),
            tutorial_speed_ms: DEFAULT_TUTORIAL_SPEED_MS,
            output_speed_ms: DEFAULT_OUTPUT_SPEED_MS,
            api_base: String::new(),
        }
    }
}

impl TerminalConfig {
    pub fn endpoint(&self, route: &str) -> String {
        format!("{}{route}", self.api_base.trim_end_matches('/'))
    }

    /// Loads the page's terminal settings, falling back to defaults.
    pub async fn load() -> Self {
        match utils::fetch_json::<TerminalConfig>(CONFIG_PATH).await {
            Ok(config) => config,
            Err(err) => {
                utils::log(&utils::format_js_error(
                    "Using default terminal settings",
                    err,
                ));
                TerminalConfig::default()
            }
        }
    }
}
