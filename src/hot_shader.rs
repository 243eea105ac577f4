use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::device::{ProgramDescriptor, ProgramId, ProgramKind, RenderDevice};
use crate::error::Result;

/// A shader source that can be hot-reloaded from disk.
#[derive(Debug)]
pub struct ShaderFile {
    path: PathBuf,
    last_modified: SystemTime,
    source: String,
}

impl ShaderFile {
    /// Load a shader from the given file path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let source = fs::read_to_string(&path)?;
        let last_modified = fs::metadata(&path)?.modified()?;

        Ok(Self {
            path,
            last_modified,
            source,
        })
    }

    /// Check if the shader file has been modified and reload if so.
    /// Returns `true` if the source changed.
    pub fn check_reload(&mut self) -> bool {
        let Ok(metadata) = fs::metadata(&self.path) else {
            return false;
        };

        let Ok(modified) = metadata.modified() else {
            return false;
        };

        if modified > self.last_modified {
            if let Ok(source) = fs::read_to_string(&self.path) {
                self.last_modified = modified;
                if source != self.source {
                    self.source = source;
                    return true;
                }
            }
        }

        false
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Where a program's text comes from.
#[derive(Debug)]
pub enum ShaderSource {
    Inline(String),
    /// Read on first compile, then polled for changes every frame.
    Watched {
        path: PathBuf,
        file: Option<ShaderFile>,
    },
}

impl ShaderSource {
    pub fn watched(path: impl Into<PathBuf>) -> Self {
        ShaderSource::Watched {
            path: path.into(),
            file: None,
        }
    }

    fn load(&mut self) -> Result<&str> {
        match self {
            ShaderSource::Inline(source) => Ok(source.as_str()),
            ShaderSource::Watched { path, file } => {
                if file.is_none() {
                    *file = Some(ShaderFile::new(&*path)?);
                }
                Ok(file.as_ref().map(ShaderFile::source).unwrap_or_default())
            }
        }
    }

    fn changed(&mut self) -> bool {
        match self {
            ShaderSource::Inline(_) => false,
            ShaderSource::Watched { file, .. } => file.as_mut().is_some_and(ShaderFile::check_reload),
        }
    }
}

impl From<&str> for ShaderSource {
    fn from(source: &str) -> Self {
        ShaderSource::Inline(source.to_string())
    }
}

impl From<String> for ShaderSource {
    fn from(source: String) -> Self {
        ShaderSource::Inline(source)
    }
}

/// One compiled program stage of a plugin.
///
/// A stage whose source fails to compile is disabled and logged, never fatal.
/// Watched stages recompile on change and keep the previous program when the
/// new source fails.
#[derive(Debug)]
pub(crate) struct ShaderStage {
    label: &'static str,
    source: ShaderSource,
    kind: Option<ProgramKind>,
    program: Option<ProgramId>,
}

impl ShaderStage {
    pub(crate) fn new(label: &'static str, source: ShaderSource) -> Self {
        Self {
            label,
            source,
            kind: None,
            program: None,
        }
    }

    pub(crate) fn program(&self) -> Option<ProgramId> {
        self.program
    }

    /// Compile for `kind`. Only I/O and device errors other than a compile
    /// failure are returned.
    pub(crate) fn compile(&mut self, gpu: &mut dyn RenderDevice, kind: ProgramKind) -> Result<()> {
        self.kind = Some(kind);
        if let Some(old) = self.program.take() {
            gpu.destroy_program(old);
        }
        let source = self.source.load()?;
        match gpu.compile_program(&ProgramDescriptor {
            label: self.label,
            source,
            kind,
        }) {
            Ok(program) => self.program = Some(program),
            Err(err) if err.is_compile_failure() => {
                log::error!("{err}; {} stage disabled", self.label);
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    /// Recompile if the watched file changed.
    pub(crate) fn reload(&mut self, gpu: &mut dyn RenderDevice) {
        let Some(kind) = self.kind else {
            return;
        };
        if !self.source.changed() {
            return;
        }
        if let ShaderSource::Watched { path, .. } = &self.source {
            log::info!("reloading shader {}", path.display());
        }

        let source = match self.source.load() {
            Ok(source) => source,
            Err(err) => {
                log::error!("{err}");
                return;
            }
        };
        match gpu.compile_program(&ProgramDescriptor {
            label: self.label,
            source,
            kind,
        }) {
            Ok(program) => {
                if let Some(old) = self.program.replace(program) {
                    gpu.destroy_program(old);
                }
                log::info!("{} stage recompiled", self.label);
            }
            Err(err) => log::error!("{err}; keeping previous {} program", self.label),
        }
    }

    pub(crate) fn destroy(&mut self, gpu: &mut dyn RenderDevice) {
        if let Some(program) = self.program.take() {
            gpu.destroy_program(program);
        }
        self.kind = None;
    }
}
