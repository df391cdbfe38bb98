//! Flag file read by other scripts on the box: literally `True` or `False`.

use crate::state::ArmState;
use std::fs;
use std::io;
use std::path::PathBuf;

pub trait FlagSink: Send {
    fn write(&mut self, state: ArmState) -> io::Result<()>;
}

pub struct FlagFile {
    path: PathBuf,
}

impl FlagFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FlagSink for FlagFile {
    /// Unknown is skipped. Writes go through a sibling temp file so readers never see
    /// a half-written value.
    fn write(&mut self, state: ArmState) -> io::Result<()> {
        let Some(literal) = state.flag_literal() else {
            return Ok(());
        };
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        fs::write(&tmp, literal)?;
        fs::rename(&tmp, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_python_style_literals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arlo_armed");
        let mut flag = FlagFile::new(path.clone());

        flag.write(ArmState::Armed).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "True");
        flag.write(ArmState::Disarmed).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "False");
    }

    #[test]
    fn unknown_leaves_the_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arlo_armed");
        let mut flag = FlagFile::new(path.clone());

        flag.write(ArmState::Unknown).unwrap();
        assert!(!path.exists());
        flag.write(ArmState::Armed).unwrap();
        flag.write(ArmState::Unknown).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "True");
    }
}
