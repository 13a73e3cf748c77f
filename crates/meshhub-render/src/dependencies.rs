//! Resource dependency validation hook
//!
//! The caller decides what a dependency needs (a secret present in the
//! cluster, a mesh installed, ...). Its error is returned unchanged.

use meshhub_core::ResourceDependency;

use crate::error::{RenderError, Result};

pub trait DependencyValidator: Send + Sync {
    fn validate(&self, dependencies: &[ResourceDependency]) -> Result<()>;
}

impl<F> DependencyValidator for F
where
    F: Fn(&[ResourceDependency]) -> Result<()> + Send + Sync,
{
    fn validate(&self, dependencies: &[ResourceDependency]) -> Result<()> {
        self(dependencies)
    }
}

/// Accepts everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDependencyValidator;

impl DependencyValidator for NoopDependencyValidator {
    fn validate(&self, _dependencies: &[ResourceDependency]) -> Result<()> {
        Ok(())
    }
}

/// Checks that dependencies are well formed, without looking at a cluster
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticDependencyValidator;

impl DependencyValidator for StaticDependencyValidator {
    fn validate(&self, dependencies: &[ResourceDependency]) -> Result<()> {
        for dependency in dependencies {
            match dependency {
                ResourceDependency::SecretDependency(secret) => {
                    if secret.name.is_empty() {
                        return Err(RenderError::InvalidDependency {
                            message: "secret dependency has no name".to_string(),
                        });
                    }
                    if secret.keys.is_empty() {
                        return Err(RenderError::InvalidDependency {
                            message: format!("secret dependency {} has no keys", secret.name),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshhub_core::SecretDependency;

    fn secret(name: &str, keys: &[&str]) -> ResourceDependency {
        ResourceDependency::SecretDependency(SecretDependency {
            name: name.to_string(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        })
    }

    #[test]
    fn test_static_validator() {
        let validator = StaticDependencyValidator;
        assert!(validator.validate(&[secret("certs", &["tls.crt"])]).is_ok());

        let err = validator.validate(&[secret("", &["tls.crt"])]).unwrap_err();
        assert_eq!(err.to_string(), "secret dependency has no name");

        let err = validator.validate(&[secret("certs", &[])]).unwrap_err();
        assert_eq!(err.to_string(), "secret dependency certs has no keys");
    }

    #[test]
    fn test_closure_validator() {
        let validator = |deps: &[ResourceDependency]| -> Result<()> {
            if deps.is_empty() {
                Ok(())
            } else {
                Err(RenderError::InvalidDependency {
                    message: "mesh not installed".to_string(),
                })
            }
        };
        assert!(validator.validate(&[]).is_ok());
        assert_eq!(
            validator.validate(&[secret("a", &["b"])]).unwrap_err().to_string(),
            "mesh not installed"
        );
        assert!(NoopDependencyValidator.validate(&[secret("", &[])]).is_ok());
    }
}
