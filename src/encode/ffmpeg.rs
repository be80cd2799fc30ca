use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;

/// Lines of ffmpeg diagnostics kept for error reports.
const STDERR_TAIL_LINES: usize = 40;

/// Video stream parameters for the scope render.
#[derive(Clone, Debug)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: String,
    pub pix_fmt: String,
    pub crf: u32,
}

impl EncoderSettings {
    /// ffmpeg arguments: raw RGBA frames on stdin, source audio muxed from
    /// `audio`, output truncated to the shorter stream.
    pub fn args(&self, audio: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".into(),
            "-f".into(), "rawvideo".into(),
            "-pixel_format".into(), "rgba".into(),
            "-video_size".into(), format!("{}x{}", self.width, self.height),
            "-framerate".into(), self.fps.to_string(),
            "-i".into(), "pipe:0".into(),
            "-i".into(), audio.display().to_string(),
            "-map".into(), "0:v:0".into(),
            "-map".into(), "1:a:0".into(),
            "-c:v".into(), self.codec.clone(),
            "-pix_fmt".into(), self.pix_fmt.clone(),
            "-crf".into(), self.crf.to_string(),
            "-preset".into(), "medium".into(),
            "-c:a".into(), "aac".into(),
            "-b:a".into(), "192k".into(),
            "-shortest".into(),
            output.display().to_string(),
        ]
    }

    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Raw RGBA frames piped into an ffmpeg child process.
///
/// ffmpeg's stderr is drained on a background thread for the whole encode,
/// so a chatty encoder can never stall the frame pipe.
pub struct FfmpegEncoder {
    child: Child,
    stderr: Option<JoinHandle<Vec<u8>>>,
    frame_bytes: usize,
    output: PathBuf,
    frames_written: u64,
}

impl FfmpegEncoder {
    pub fn new(settings: &EncoderSettings, audio: &Path, output: &Path) -> Result<Self> {
        let args = settings.args(audio, output);
        let encoder = Self::spawn("ffmpeg", args, settings.frame_bytes(), output)
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            settings.width,
            settings.height,
            settings.fps,
            settings.codec
        );
        Ok(encoder)
    }

    fn spawn<I, A>(
        program: impl AsRef<OsStr>,
        args: I,
        frame_bytes: usize,
        output: &Path,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut pipe = child.stderr.take().context("FFmpeg stderr not available")?;
        let stderr = std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(err) = pipe.read_to_end(&mut buf) {
                log::debug!("Stopped reading ffmpeg stderr: {}", err);
            }
            buf
        });

        Ok(Self {
            child,
            stderr: Some(stderr),
            frame_bytes,
            output: output.to_path_buf(),
            frames_written: 0,
        })
    }

    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        anyhow::ensure!(
            rgba_pixels.len() == self.frame_bytes,
            "Frame is {} bytes, encoder expects {}",
            rgba_pixels.len(),
            self.frame_bytes
        );
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        if let Err(err) = stdin.write_all(rgba_pixels) {
            let diagnostics = self.shutdown()?;
            anyhow::bail!(
                "Failed to write frame {} to ffmpeg ({}): {}\n{}",
                self.frames_written,
                err,
                diagnostics.status_text,
                diagnostics.tail
            );
        }
        self.frames_written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        let diagnostics = self.shutdown()?;
        if !diagnostics.success {
            anyhow::bail!(
                "FFmpeg exited with error ({}):\n{}",
                diagnostics.status_text,
                diagnostics.tail
            );
        }

        log::info!(
            "FFmpeg encoding complete: {} frames -> {}",
            self.frames_written,
            self.output.display()
        );
        Ok(())
    }

    /// Close stdin, reap the child and collect what it printed.
    fn shutdown(&mut self) -> Result<Diagnostics> {
        drop(self.child.stdin.take());
        let status = self.child.wait().context("Failed to wait for ffmpeg")?;

        let stderr = match self.stderr.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow::anyhow!("FFmpeg stderr reader panicked"))?,
            None => Vec::new(),
        };

        Ok(Diagnostics {
            success: status.success(),
            status_text: status.to_string(),
            tail: stderr_tail(&stderr),
        })
    }
}

struct Diagnostics {
    success: bool,
    status_text: String,
    tail: String,
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> EncoderSettings {
        EncoderSettings {
            width: 1080,
            height: 720,
            fps: 60,
            codec: "libx264".into(),
            pix_fmt: "yuv420p".into(),
            crf: 18,
        }
    }

    #[test]
    fn args_describe_raw_rgba_input_and_muxed_audio() {
        let args = settings().args(Path::new("in.flac"), Path::new("out.mp4"));
        let joined = args.join(" ");

        assert!(joined.contains("-pixel_format rgba"));
        assert!(joined.contains("-video_size 1080x720"));
        assert!(joined.contains("-framerate 60"));
        assert!(joined.contains("-i in.flac"));
        assert!(joined.contains("-crf 18"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn frame_size_is_rgba() {
        assert_eq!(settings().frame_bytes(), 1080 * 720 * 4);
    }

    #[test]
    fn frame_size_does_not_overflow_u32() {
        let mut s = settings();
        s.width = 40000;
        s.height = 40000;
        assert_eq!(s.frame_bytes(), 40000 * 40000 * 4);
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let text: String = (0..100).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(text.as_bytes());

        assert_eq!(tail.lines().count(), STDERR_TAIL_LINES);
        assert!(tail.ends_with("line 99"));
        assert!(!tail.contains("line 59\n"));
    }

    #[cfg(unix)]
    fn shell(script: &str, frame_bytes: usize) -> FfmpegEncoder {
        FfmpegEncoder::spawn("sh", ["-c", script], frame_bytes, Path::new("out.mp4")).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn chatty_encoder_does_not_stall_frame_writes() {
        // 256 KiB of progress noise before the first stdin read fills any
        // stderr pipe buffer several times over.
        let mut encoder = shell(
            "head -c 262144 /dev/zero | tr '\\0' x >&2; cat > /dev/null",
            64 * 64 * 4,
        );
        let frame = vec![0u8; 64 * 64 * 4];
        for _ in 0..200 {
            encoder.write_frame(&frame).unwrap();
        }
        encoder.finish().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn dead_encoder_reports_its_stderr() {
        let mut encoder = shell("echo 'Unknown encoder libnope' >&2; exit 1", 4096);
        let frame = vec![0u8; 4096];

        let err = (0..1000)
            .find_map(|_| encoder.write_frame(&frame).err())
            .expect("writes to an exited encoder must fail");
        assert!(format!("{:#}", err).contains("Unknown encoder libnope"));
    }

    #[cfg(unix)]
    #[test]
    fn failed_exit_reports_its_stderr() {
        let encoder = shell("cat > /dev/null; echo 'muxer failed' >&2; exit 3", 16);
        let err = encoder.finish().unwrap_err();
        assert!(format!("{:#}", err).contains("muxer failed"));
    }
}
