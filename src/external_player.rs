// External music player detection.
//
// Before a button plays, the UI may pause a desktop music player so the two
// don't overlap. Both calls are best-effort: any failure reads as "not
// playing" / no-op.

/// Process image names are passed to shell tools, so only plain file names
/// are accepted.
fn is_safe_process_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name.len() <= 64
        && name
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.'))
}

#[cfg(target_os = "windows")]
mod imp {
    use std::process::Command;

    fn run(program: &str, args: &[&str]) -> Option<String> {
        match Command::new(program).args(args).output() {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                log::debug!("{} exited with {}", program, output.status);
                None
            }
            Err(e) => {
                log::warn!("Failed to run {}: {}", program, e);
                None
            }
        }
    }

    pub fn is_active(process: &str) -> bool {
        let filter = format!("IMAGENAME eq {}", process);
        let Some(listing) = run("tasklist", &["/FI", &filter]) else {
            return false;
        };
        if !listing.to_lowercase().contains(&process.to_lowercase()) {
            log::debug!("{} process not found", process);
            return false;
        }

        // Players put "artist - title" in the window title only while playing.
        let stem = process.trim_end_matches(".exe").trim_end_matches(".EXE");
        let script = format!("Get-Process {} | Select-Object MainWindowTitle", stem);
        let Some(titles) = run("powershell", &["-NoProfile", "-Command", &script]) else {
            return false;
        };
        let playing = titles.lines().skip(2).any(|line| line.contains('-'));
        log::debug!("{} playing: {}", process, playing);
        playing
    }

    pub fn stop(process: &str) {
        match run("taskkill", &["/IM", process, "/F"]) {
            Some(_) => log::info!("Stopped external player {}", process),
            None => log::warn!("Failed to stop external player {}", process),
        }
    }
}

#[cfg(not(target_os = "windows"))]
mod imp {
    pub fn is_active(_process: &str) -> bool {
        false
    }

    pub fn stop(_process: &str) {}
}

/// Whether the external player `process` (an image name such as
/// `KuGou.exe`) is running and currently playing.
pub fn is_external_player_active(process: &str) -> bool {
    if !is_safe_process_name(process) {
        log::warn!("Ignoring unsafe external player name: {:?}", process);
        return false;
    }
    imp::is_active(process)
}

/// Stop the external player. Failures are logged and otherwise ignored.
pub fn stop_external_player(process: &str) {
    if !is_safe_process_name(process) {
        log::warn!("Ignoring unsafe external player name: {:?}", process);
        return;
    }
    imp::stop(process);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_process_names() {
        assert!(is_safe_process_name("KuGou.exe"));
        assert!(is_safe_process_name("cloud_music-2.exe"));
        assert!(!is_safe_process_name(""));
        assert!(!is_safe_process_name("a.exe & del *"));
        assert!(!is_safe_process_name("..\\evil.exe"));
    }

    #[test]
    fn test_unsafe_name_is_never_active() {
        assert!(!is_external_player_active("x\" /FI \"y"));
        stop_external_player("x; rm -rf /");
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_non_windows_is_inactive() {
        assert!(!is_external_player_active("KuGou.exe"));
    }
}
