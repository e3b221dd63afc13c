pub mod code_fence;
