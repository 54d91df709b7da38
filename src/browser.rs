use std::process::Command;

/// Platform command that opens a URL in the default browser.
fn opener(url: &str) -> Command {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(url);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", "", url]);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(url);
        cmd
    }
}

/// Opens the chat page. Failure is only logged.
pub fn open(url: &str) {
    match opener(url).spawn() {
        Ok(_) => log::info!("🖥️ Opened {} in the browser", url),
        Err(e) => log::warn!("⚠️ Could not open a browser ({}), visit {} manually", e, url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opener_passes_the_url() {
        let cmd = opener("http://127.0.0.1:7860/");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args.last().map(String::as_str), Some("http://127.0.0.1:7860/"));
    }
}
