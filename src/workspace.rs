use crate::{*, error::*};
use libc::pid_t;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

// C2: per-pid scratch directory holding the IPC files. Creation is idempotent; the directory
// outlives detach (debuggable post-mortem) and is only ever truncated, never deleted by us.
pub struct Workspace {
    dir: PathBuf,
}

const SEND_BLOB: &str = "send.blob";
const RECV_BLOB: &str = "recv.blob";
const CMD_SCRIPT: &str = "cmd.script";
const ASYNC_LOG: &str = "async.log";
const STATUS_FILE: &str = "status.txt";

impl Workspace {
    pub fn create(pid: pid_t, root: Option<&Path>) -> Result<Workspace> {
        let base = root.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
        let dir = base.join(format!("pince-dcl-{}", pid));
        fs::create_dir_all(&dir)?;
        widen_permissions(&dir)?;
        let ws = Workspace {dir};
        // Re-attach must not see a previous session's stale recv blob.
        ws.truncate_recv()?;
        for name in [SEND_BLOB, CMD_SCRIPT, ASYNC_LOG, STATUS_FILE] {
            let p = ws.dir.join(name);
            if !p.exists() {
                fs::File::create(&p)?;
                widen_permissions(&p)?;
            }
        }
        Ok(ws)
    }

    pub fn dir(&self) -> &Path { &self.dir }
    pub fn send_blob_path(&self) -> PathBuf { self.dir.join(SEND_BLOB) }
    pub fn recv_blob_path(&self) -> PathBuf { self.dir.join(RECV_BLOB) }
    pub fn cmd_script_path(&self) -> PathBuf { self.dir.join(CMD_SCRIPT) }
    pub fn async_log_path(&self) -> PathBuf { self.dir.join(ASYNC_LOG) }
    pub fn status_path(&self) -> PathBuf { self.dir.join(STATUS_FILE) }

    pub fn truncate_recv(&self) -> Result<()> {
        OpenOptions::new().write(true).create(true).truncate(true).open(self.recv_blob_path())?;
        widen_permissions(&self.recv_blob_path())?;
        Ok(())
    }

    pub fn write_send_blob(&self, bytes: &[u8]) -> Result<()> {
        fs::write(self.send_blob_path(), bytes)?;
        Ok(())
    }

    pub fn read_recv_blob(&self) -> Result<Vec<u8>> {
        Ok(fs::read(self.recv_blob_path())?)
    }

    pub fn write_cmd_script(&self, text: &str) -> Result<()> {
        let mut f = fs::File::create(self.cmd_script_path())?;
        f.write_all(text.as_bytes())?;
        Ok(())
    }
}

// Widen permissions so a debugger subprocess running under sudo (different uid) can still
// read/write these files created by our (unprivileged) process.
#[cfg(unix)]
fn widen_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = fs::Permissions::from_mode(0o666);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_is_idempotent_and_truncates_recv() {
        let tmp = std::env::temp_dir().join(format!("pince-dcl-test-{}", crate::util::random_u64()));
        let ws = Workspace::create(4242, Some(&tmp)).unwrap();
        ws.write_send_blob(b"hello").unwrap();
        fs::write(ws.recv_blob_path(), b"stale data").unwrap();

        let ws2 = Workspace::create(4242, Some(&tmp)).unwrap();
        assert_eq!(ws2.read_recv_blob().unwrap(), Vec::<u8>::new());
        assert_eq!(fs::read(ws2.send_blob_path()).unwrap(), b"hello");

        fs::remove_dir_all(&tmp).ok();
    }
}
