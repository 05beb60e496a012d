// src/exec/command.rs

use std::path::Path;

use tokio::process::Command;

/// Build a shell command appropriate for the platform, running in `cwd`.
///
/// With `new_process_group` set (Unix only) the child becomes the leader of
/// a fresh process group, so the supervisor can signal it together with
/// everything it spawns. It also keeps terminal Ctrl-C away from the child.
pub fn shell_command(cmd: &str, cwd: &Path, new_process_group: bool) -> Command {
    let mut c = if cfg!(windows) {
        let mut c = std::process::Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = std::process::Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    c.current_dir(cwd);

    #[cfg(unix)]
    if new_process_group {
        use std::os::unix::process::CommandExt;
        c.process_group(0);
    }
    #[cfg(not(unix))]
    let _ = new_process_group;

    Command::from(c)
}
