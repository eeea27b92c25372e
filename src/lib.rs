//! Workspace-level integration tests for `fftmul`.
