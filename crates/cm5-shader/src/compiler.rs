//! The process-wide shader compiler.
//!
//! [`ShaderCompiler::startup`] hands out [`CompilerSession`] handles.
//! Sessions are reference-counted per [`Target`]: a second startup for a
//! target that is already running shares the live session, and the
//! compiler shuts down when the last handle (including the copies held
//! by [`CompiledProgram`]s) is dropped.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::error::{CompileError, CompileErrorKind, CompilerInitError, SourceLocation};
use crate::program::{reflect_bindings, CompiledProgram};
use crate::source::ShaderSource;

// ── Target ─────────────────────────────────────────────────────────

/// Execution backend a session compiles for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// Host reference kernels. Always available.
    Cpu,
    /// wgpu compute pipelines. Requires the `gpu` feature and an adapter.
    Gpu,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Gpu => write!(f, "gpu"),
        }
    }
}

// ── CompilerConfig ─────────────────────────────────────────────────

/// Startup options for a compiler session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Backend to compile for. Default: [`Target::Cpu`].
    pub target: Target,
    /// Upper bound on `@workgroup_size` invocations. Default: 256, the
    /// WebGPU baseline limit.
    pub max_workgroup_invocations: u32,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            target: Target::Cpu,
            max_workgroup_invocations: 256,
        }
    }
}

impl CompilerConfig {
    /// Default configuration for `target`.
    pub fn for_target(target: Target) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }
}

// ── Session registry ───────────────────────────────────────────────

static SESSIONS: Mutex<Vec<(Target, Weak<SessionInner>)>> = Mutex::new(Vec::new());
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

struct SessionInner {
    target: Target,
    config: CompilerConfig,
    serial: u64,
    compiled: AtomicUsize,
    #[cfg(feature = "gpu")]
    gpu: Option<crate::gpu::GpuContext>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        log::info!(
            "shader compiler ({}) shut down after {} program(s)",
            self.target,
            self.compiled.load(Ordering::Relaxed)
        );
    }
}

/// Entry points for starting and inspecting the compiler.
pub struct ShaderCompiler;

impl ShaderCompiler {
    /// Start the compiler for `config.target`, or join the running session.
    ///
    /// Thread-safe. When a session for the target is already live its
    /// handle is shared and `config` is ignored apart from the target.
    pub fn startup(config: CompilerConfig) -> Result<CompilerSession, CompilerInitError> {
        if config.max_workgroup_invocations == 0 {
            return Err(CompilerInitError::InvalidConfig {
                reason: "max_workgroup_invocations must be at least 1".into(),
            });
        }

        #[cfg(not(feature = "gpu"))]
        if config.target == Target::Gpu {
            return Err(CompilerInitError::BackendUnavailable {
                target: Target::Gpu,
                reason: "built without the `gpu` feature".into(),
            });
        }

        let mut sessions = SESSIONS.lock().unwrap_or_else(|e| e.into_inner());
        sessions.retain(|(_, weak)| weak.strong_count() > 0);
        if let Some(inner) = sessions
            .iter()
            .filter(|(target, _)| *target == config.target)
            .find_map(|(_, weak)| weak.upgrade())
        {
            log::debug!("joined running {} shader compiler", config.target);
            return Ok(CompilerSession { inner });
        }

        let inner = Arc::new(SessionInner {
            target: config.target,
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            compiled: AtomicUsize::new(0),
            #[cfg(feature = "gpu")]
            gpu: match config.target {
                Target::Cpu => None,
                Target::Gpu => Some(crate::gpu::GpuContext::acquire()?),
            },
            config,
        });

        sessions.push((inner.target, Arc::downgrade(&inner)));
        log::info!("shader compiler ({}) started", inner.target);
        Ok(CompilerSession { inner })
    }

    /// Whether a session for `target` is currently alive.
    pub fn is_running(target: Target) -> bool {
        let sessions = SESSIONS.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .iter()
            .any(|(t, weak)| *t == target && weak.strong_count() > 0)
    }
}

// ── CompilerSession ────────────────────────────────────────────────

/// Handle on a running compiler.
///
/// Cloning is cheap. Dropping the last clone shuts the compiler down.
#[derive(Clone)]
pub struct CompilerSession {
    inner: Arc<SessionInner>,
}

impl CompilerSession {
    /// Backend this session compiles for.
    pub fn target(&self) -> Target {
        self.inner.target
    }

    /// Configuration the session was started with.
    pub fn config(&self) -> &CompilerConfig {
        &self.inner.config
    }

    /// Whether two handles refer to the same running compiler.
    pub fn same_session(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Process-unique number of the underlying session.
    pub fn serial(&self) -> u64 {
        self.inner.serial
    }

    /// Programs compiled by this session so far.
    pub fn compiled_count(&self) -> usize {
        self.inner.compiled.load(Ordering::Relaxed)
    }

    /// GPU device of a [`Target::Gpu`] session.
    #[cfg(feature = "gpu")]
    pub fn gpu(&self) -> Option<&crate::gpu::GpuContext> {
        self.inner.gpu.as_ref()
    }

    /// Compile WGSL source into a validated program.
    ///
    /// Parses, validates, requires exactly one `@compute` entry point
    /// within the workgroup limit, and reflects its bindings. A pure
    /// function of the text: no partial program is ever returned.
    pub fn compile(&self, source: &ShaderSource) -> Result<CompiledProgram, CompileError> {
        let result = self.compile_inner(source);
        match &result {
            Ok(program) => {
                self.inner.compiled.fetch_add(1, Ordering::Relaxed);
                log::debug!(
                    "compiled {} (entry point `{}`, {} binding(s))",
                    program.path(),
                    program.entry_point(),
                    program.bindings().len()
                );
            }
            Err(e) => log::warn!("{e}"),
        }
        result
    }

    fn compile_inner(&self, source: &ShaderSource) -> Result<CompiledProgram, CompileError> {
        let path = source.path();
        let text = source.text();

        let module = naga::front::wgsl::parse_str(text).map_err(|e| {
            let location = e.location(text).map(convert_location);
            CompileError {
                path: path.to_string(),
                kind: CompileErrorKind::Parse,
                message: e.message().to_string(),
                location,
                rendered: e.emit_to_string(text),
            }
        })?;

        let info = validator().validate(&module).map_err(|e| {
            let location = e.location(text).map(convert_location);
            let message = e.as_inner().to_string();
            CompileError {
                path: path.to_string(),
                kind: CompileErrorKind::Validation,
                rendered: render_diagnostic(path, text, location, &message),
                message,
                location,
            }
        })?;

        let entry_error = |message: String| CompileError {
            path: path.to_string(),
            kind: CompileErrorKind::EntryPoint,
            rendered: render_diagnostic(path, text, None, &message),
            message,
            location: None,
        };

        let mut compute = module
            .entry_points
            .iter()
            .enumerate()
            .filter(|(_, ep)| ep.stage == naga::ShaderStage::Compute);
        let (ep_index, ep) = match (compute.next(), compute.next()) {
            (Some(found), None) => found,
            (None, _) => return Err(entry_error("no @compute entry point".into())),
            (Some(_), Some(_)) => {
                return Err(entry_error("more than one @compute entry point".into()))
            }
        };

        let invocations: u64 = ep.workgroup_size.iter().map(|&n| u64::from(n)).product();
        let limit = self.inner.config.max_workgroup_invocations;
        if invocations == 0 || invocations > u64::from(limit) {
            return Err(entry_error(format!(
                "entry point `{}` has {invocations} invocations per workgroup, limit is {limit}",
                ep.name
            )));
        }

        let Some(id) = source.id() else {
            return Err(entry_error(format!("path '{path}' has no usable file stem")));
        };

        let bindings = reflect_bindings(&module, &info, ep_index);
        let entry_point = ep.name.clone();
        let workgroup_size = ep.workgroup_size;
        let canonical = canonical_form(&module, &info, text);

        Ok(CompiledProgram::new(
            id,
            path.to_string(),
            text.to_string(),
            canonical,
            module,
            entry_point,
            workgroup_size,
            bindings,
            self.clone(),
        ))
    }
}

impl fmt::Debug for CompilerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerSession")
            .field("target", &self.inner.target)
            .field("serial", &self.inner.serial)
            .finish_non_exhaustive()
    }
}

fn validator() -> naga::valid::Validator {
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
}

/// `module` re-emitted by naga's WGSL writer. Comments and layout do not
/// survive, so sources with the same IR share one canonical text. Falls
/// back to `text` when the writer cannot express the module.
fn canonical_form(module: &naga::Module, info: &naga::valid::ModuleInfo, text: &str) -> String {
    let flags = naga::back::wgsl::WriterFlags::EXPLICIT_TYPES;
    match naga::back::wgsl::write_string(module, info, flags) {
        Ok(canonical) => canonical,
        Err(e) => {
            log::debug!("WGSL writer failed ({e}); using the source text as canonical form");
            text.to_string()
        }
    }
}

/// The canonical WGSL of `text`, as
/// [`CompiledProgram::canonical_source`] reports it for a program
/// compiled from the same text. `None` if `text` does not parse or
/// validate.
pub fn canonical_wgsl(text: &str) -> Option<String> {
    let module = naga::front::wgsl::parse_str(text).ok()?;
    let info = validator().validate(&module).ok()?;
    Some(canonical_form(&module, &info, text))
}

fn convert_location(loc: naga::SourceLocation) -> SourceLocation {
    SourceLocation {
        line: loc.line_number,
        column: loc.line_position,
    }
}

/// Render `message` with the source line it points at and a caret.
fn render_diagnostic(
    path: &str,
    text: &str,
    location: Option<SourceLocation>,
    message: &str,
) -> String {
    let mut out = format!("error: {message}\n");
    let Some(loc) = location else {
        out.push_str(&format!("  --> {path}\n"));
        return out;
    };
    out.push_str(&format!("  --> {path}:{loc}\n"));
    if let Some(line) = text.lines().nth(loc.line.saturating_sub(1) as usize) {
        let gutter = loc.line.to_string().len();
        let pad = " ".repeat(gutter);
        let caret = " ".repeat(loc.column.saturating_sub(1) as usize);
        out.push_str(&format!("{pad} |\n{} | {line}\n{pad} | {caret}^\n", loc.line));
    }
    out
}
