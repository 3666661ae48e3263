//! Compiler startup and shutdown as seen by a whole process.
//!
//! A single test: the session table is process-wide, so parallel tests
//! in this binary would observe each other's sessions.

use cm5_shader::{CompilerConfig, ShaderCompiler, ShaderSource, Target};

const KERNEL: &str = "@compute @workgroup_size(1) fn main() {}";

#[test]
fn last_handle_shuts_the_compiler_down() {
    let _ = env_logger::builder().is_test(true).try_init();

    assert!(!ShaderCompiler::is_running(Target::Cpu));

    // Startup and shutdown with nothing compiled.
    let idle = ShaderCompiler::startup(CompilerConfig::default()).unwrap();
    assert!(ShaderCompiler::is_running(Target::Cpu));
    assert_eq!(idle.compiled_count(), 0);
    let idle_serial = idle.serial();
    drop(idle);
    assert!(!ShaderCompiler::is_running(Target::Cpu));

    // A program keeps the session alive after the caller's handle is gone.
    let session = ShaderCompiler::startup(CompilerConfig::default()).unwrap();
    assert_ne!(session.serial(), idle_serial);
    let program = session
        .compile(&ShaderSource::new("shaders/noop.wgsl", KERNEL))
        .unwrap();
    let again = ShaderCompiler::startup(CompilerConfig::default()).unwrap();
    assert!(again.same_session(&session));
    drop(session);
    drop(again);
    assert!(ShaderCompiler::is_running(Target::Cpu));
    assert_eq!(program.session().compiled_count(), 1);
    drop(program);
    assert!(!ShaderCompiler::is_running(Target::Cpu));

    // Concurrent startups all join a single session.
    let handles: Vec<_> = (0..8)
        .map(|_| {
            std::thread::spawn(|| {
                ShaderCompiler::startup(CompilerConfig::for_target(Target::Cpu)).unwrap()
            })
        })
        .collect();
    let sessions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for s in &sessions[1..] {
        assert!(s.same_session(&sessions[0]));
    }
    drop(sessions);
    assert!(!ShaderCompiler::is_running(Target::Cpu));
}
