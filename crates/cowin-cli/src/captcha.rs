use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use cwn_api::CowinApi;
use cwn_core::types::Credential;
use cwn_scheduler::{CaptchaSource, Operator};

const CAPTCHA_HTML: &str = r#"<!DOCTYPE html><html><body><img src="captcha.svg"></body></html>"#;

/// Fetches the captcha challenge, drops it next to the binary as an SVG
/// wrapped in a minimal HTML page, and asks the operator to transcribe it.
pub struct FileCaptcha<'a> {
    operator: &'a dyn Operator,
    dir: PathBuf,
}

impl<'a> FileCaptcha<'a> {
    pub fn new(operator: &'a dyn Operator, dir: PathBuf) -> Self {
        Self { operator, dir }
    }
}

#[async_trait]
impl CaptchaSource for FileCaptcha<'_> {
    async fn transcribe(&self, api: &dyn CowinApi, credential: &Credential) -> Result<String> {
        let svg = api.recaptcha(credential).await?;
        let html_path = write_challenge(&self.dir, &svg)?;
        println!(
            "Captcha saved. Ctrl+Click to view it:\nfile://{}",
            html_path.display()
        );
        self.operator.prompt("Enter captcha text:").await
    }
}

fn write_challenge(dir: &Path, svg: &str) -> Result<PathBuf> {
    let svg_path = dir.join("captcha.svg");
    std::fs::write(&svg_path, svg)
        .with_context(|| format!("failed to write {}", svg_path.display()))?;
    let html_path = dir.join("captcha.html");
    std::fs::write(&html_path, CAPTCHA_HTML)
        .with_context(|| format!("failed to write {}", html_path.display()))?;
    Ok(html_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_challenge_creates_svg_and_html() {
        let dir = tempfile::tempdir().unwrap();
        let html_path = write_challenge(dir.path(), "<svg>abc</svg>").unwrap();
        assert_eq!(html_path, dir.path().join("captcha.html"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("captcha.svg")).unwrap(),
            "<svg>abc</svg>"
        );
        let html = std::fs::read_to_string(&html_path).unwrap();
        assert!(html.contains(r#"img src="captcha.svg""#));
    }
}
