use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use crate::error::EngineError;
use crate::opts::TranscriptionOptions;
use crate::transcript::Transcript;

/// Pluggable speech-recognition engine used by [`crate::orchestrator::BatchOrchestrator`].
///
/// An engine turns one media file into a [`Transcript`]. Calls may take minutes and are not
/// cancellable. Implementations that hold an expensive loaded model take `&mut self`, so a single
/// instance is never driven concurrently.
pub trait TranscriptionEngine {
    fn transcribe(
        &mut self,
        path: &Path,
        opts: &TranscriptionOptions,
    ) -> Result<Transcript, EngineError>;
}

impl<E: TranscriptionEngine + ?Sized> TranscriptionEngine for Box<E> {
    fn transcribe(
        &mut self,
        path: &Path,
        opts: &TranscriptionOptions,
    ) -> Result<Transcript, EngineError> {
        (**self).transcribe(path, opts)
    }
}

/// Invoke `engine` with panics converted into [`EngineError::Panicked`].
///
/// Whatever goes wrong inside the engine ends up as a per-file failure, never as an unwinding
/// batch.
pub fn transcribe_guarded<E>(
    engine: &mut E,
    path: &Path,
    opts: &TranscriptionOptions,
) -> Result<Transcript, EngineError>
where
    E: TranscriptionEngine + ?Sized,
{
    catch_unwind(AssertUnwindSafe(|| engine.transcribe(path, opts)))
        .unwrap_or_else(|payload| Err(EngineError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_size::ModelSize;

    struct Panicky;

    impl TranscriptionEngine for Panicky {
        fn transcribe(
            &mut self,
            _path: &Path,
            _opts: &TranscriptionOptions,
        ) -> Result<Transcript, EngineError> {
            panic!("model exploded");
        }
    }

    struct Echo;

    impl TranscriptionEngine for Echo {
        fn transcribe(
            &mut self,
            path: &Path,
            opts: &TranscriptionOptions,
        ) -> Result<Transcript, EngineError> {
            Ok(Transcript {
                source: path.to_path_buf(),
                model_size: opts.model_size,
                language: None,
                segments: Vec::new(),
            })
        }
    }

    #[test]
    fn panics_become_engine_errors() {
        let err = transcribe_guarded(
            &mut Panicky,
            Path::new("x.wav"),
            &TranscriptionOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Panicked(ref msg) if msg == "model exploded"));
    }

    #[test]
    fn boxed_engines_delegate() -> anyhow::Result<()> {
        let mut engine: Box<dyn TranscriptionEngine> = Box::new(Echo);
        let opts = TranscriptionOptions {
            model_size: ModelSize::Small,
            ..Default::default()
        };
        let transcript = transcribe_guarded(&mut engine, Path::new("x.wav"), &opts)?;
        assert_eq!(transcript.model_size, ModelSize::Small);
        Ok(())
    }
}
