//! Call-site metadata
//!
//! Captured as a `&'static Location` through `#[track_caller]`; the short
//! file name is derived on demand from the stored path.

use std::panic::Location;

/// Source location of the log call
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    location: &'static Location<'static>,
    module: Option<&'static str>,
}

impl Caller {
    #[track_caller]
    pub fn here() -> Self {
        Self {
            location: Location::caller(),
            module: None,
        }
    }

    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self {
            location,
            module: None,
        }
    }

    pub fn with_module(mut self, module: &'static str) -> Self {
        self.module = Some(module);
        self
    }

    /// Full source path as recorded by the compiler
    pub fn path(&self) -> &'static str {
        self.location.file()
    }

    /// File name without directories
    pub fn file(&self) -> &'static str {
        let path = self.location.file();
        path.rsplit(['/', '\\']).next().unwrap_or(path)
    }

    pub fn line(&self) -> u32 {
        self.location.line()
    }

    /// Last path segment of the module, if one was attached
    pub fn module(&self) -> Option<&'static str> {
        self.module.map(|m| m.rsplit("::").next().unwrap_or(m))
    }
}
