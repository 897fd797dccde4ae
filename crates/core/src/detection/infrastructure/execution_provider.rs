use std::fmt;
use std::str::FromStr;

/// Which ONNX Runtime backend to run the detection model on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionTarget {
    /// Platform accelerator when available (CoreML / DirectML), else CPU.
    #[default]
    Auto,
    Cpu,
}

impl ExecutionTarget {
    /// Providers to register on the session builder, in priority order.
    /// ONNX Runtime falls back to CPU for anything they do not cover.
    pub fn providers(&self) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
        match self {
            ExecutionTarget::Cpu => vec![],
            ExecutionTarget::Auto => platform_providers(),
        }
    }
}

fn platform_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

impl fmt::Display for ExecutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionTarget::Auto => f.write_str("auto"),
            ExecutionTarget::Cpu => f.write_str("cpu"),
        }
    }
}

impl FromStr for ExecutionTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ExecutionTarget::Auto),
            "cpu" => Ok(ExecutionTarget::Cpu),
            other => Err(format!("execution target must be 'auto' or 'cpu', got '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_registers_no_providers() {
        assert!(ExecutionTarget::Cpu.providers().is_empty());
    }

    #[test]
    fn test_parse() {
        assert_eq!("AUTO".parse::<ExecutionTarget>().unwrap(), ExecutionTarget::Auto);
        assert_eq!("cpu".parse::<ExecutionTarget>().unwrap(), ExecutionTarget::Cpu);
        assert!("gpu".parse::<ExecutionTarget>().is_err());
    }
}
