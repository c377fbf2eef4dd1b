use std::fs;
use std::path::Path;

use chrono::Local;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::Plot;

use crate::error::{ClassifierError, Result};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

enum Block {
    Content(Markup),
    Plot(Plot),
}

/// A titled block of markup and plots.
pub struct ReportSection {
    title: String,
    blocks: Vec<Block>,
}

impl ReportSection {
    pub fn new(title: &str) -> Self {
        ReportSection {
            title: title.to_string(),
            blocks: Vec::new(),
        }
    }

    pub fn add_content(&mut self, content: Markup) {
        self.blocks.push(Block::Content(content));
    }

    pub fn add_plot(&mut self, plot: Plot) {
        self.blocks.push(Block::Plot(plot));
    }

    fn render(&self, index: usize) -> Markup {
        html! {
            section {
                h2 { (self.title) }
                @for (i, block) in self.blocks.iter().enumerate() {
                    @match block {
                        Block::Content(markup) => div class="content" { (markup) },
                        Block::Plot(plot) => div class="plot" {
                            (PreEscaped(plot.to_inline_html(Some(&format!("plot-{index}-{i}")))))
                        },
                    }
                }
            }
        }
    }
}

/// Self-contained HTML report built from sections.
pub struct Report {
    tool: String,
    version: String,
    logo: Option<String>,
    title: String,
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(tool: &str, version: &str, logo: Option<&str>, title: &str) -> Self {
        Report {
            tool: tool.to_string(),
            version: version.to_string(),
            logo: logo.map(str::to_string),
            title: title.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> Markup {
        let generated = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.title) }
                    script src=(PLOTLY_CDN) {}
                    style {
                        "body { font-family: sans-serif; margin: 2em auto; max-width: 1100px; }
                         section { margin-bottom: 2em; }
                         pre { background-color: #f5f5f5; padding: 10px; border-radius: 5px; overflow-x: auto; }
                         table { border-collapse: collapse; }
                         td, th { padding: 4px 12px; text-align: right; }"
                    }
                }
                body {
                    header {
                        @if let Some(logo) = &self.logo {
                            img src=(logo) alt=(self.tool) height="60";
                        }
                        h1 { (self.title) }
                        p { (self.tool) " v" (self.version) " | generated " (generated) }
                    }
                    @for (i, section) in self.sections.iter().enumerate() {
                        (section.render(i))
                    }
                }
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.render().into_string()).map_err(|e| ClassifierError::io(path, e))?;
        log::info!("Report written to {}", path.display());
        Ok(())
    }
}
