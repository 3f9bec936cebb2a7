pub mod covariance;
pub mod registry;
pub mod transform;

pub use covariance::Kernel;
pub use registry::{KernelRegistry, KernelSpec, BASE_KERNELS, DEFAULT_GRAMMAR_KERNELS};
pub use transform::{ast_to_kernel, ast_to_text, kernel_to_ast, pretty_print, validate};
