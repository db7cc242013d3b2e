// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Binds natively compiled units (shared libraries built against
//! `lazyflow-unit-abi`).

use std::ffi::c_void;
use std::path::{Path, PathBuf};

use lazyflow_unit_abi::{
    symbols, UnitAbiVersionFn, UnitBuffer, UnitCreateFn, UnitDestroyFn, UnitElementKind,
    UnitFireFn, UnitInitializeFn, UnitWrapupFn, UNIT_OK,
};
use libloading::Library;

use crate::core::binding::{
    ArtifactLoader, EntryPoint, GeneratorPackage, OpenedArtifact, UnitInstance,
};
use crate::core::error::BindError;
use crate::core::graph::PortType;
use crate::core::marshal::{ChannelRows, OutputShape, PortBuffer, PortOutput};
use crate::core::{FlowError, Result};

/// Loader errors meaning "built for another platform", as opposed to a
/// missing or corrupt file.
const FOREIGN_FORMAT_MARKERS: &[&str] = &[
    "wrong ELF class",
    "invalid ELF header",
    "not a mach-o file",
    "wrong architecture",
    "incompatible architecture",
    "not a valid Win32 application",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl NativeLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactLoader for NativeLoader {
    fn package(&self) -> GeneratorPackage {
        GeneratorPackage::Native
    }

    fn open(&self, path: &Path) -> std::result::Result<Box<dyn OpenedArtifact>, BindError> {
        let library = unsafe { Library::new(path) }.map_err(|e| classify_load_error(path, e))?;
        tracing::debug!("[bind] opened native unit {}", path.display());
        Ok(Box::new(NativeArtifact {
            path: path.to_path_buf(),
            library,
        }))
    }
}

fn classify_load_error(path: &Path, err: libloading::Error) -> BindError {
    let message = err.to_string();
    if FOREIGN_FORMAT_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
    {
        BindError::IncompatibleFormat {
            path: path.to_path_buf(),
            reason: message,
        }
    } else {
        BindError::Load {
            path: path.to_path_buf(),
            source: Box::new(err),
        }
    }
}

struct NativeArtifact {
    path: PathBuf,
    library: Library,
}

impl NativeArtifact {
    fn missing(&self, symbol: &str) -> BindError {
        BindError::MissingEntryPoint {
            path: self.path.clone(),
            entry_point: symbol.to_string(),
        }
    }
}

/// Copy a function pointer out of `library`. The caller keeps the library
/// alive for as long as the pointer is used.
unsafe fn resolve<T: Copy>(library: &Library, symbol: &str) -> Option<T> {
    unsafe { library.get::<T>(symbol.as_bytes()) }
        .ok()
        .map(|s| *s)
}

impl OpenedArtifact for NativeArtifact {
    fn path(&self) -> &Path {
        &self.path
    }

    fn abi_version(&self) -> std::result::Result<u32, BindError> {
        let version_fn: UnitAbiVersionFn =
            unsafe { resolve(&self.library, symbols::ABI_VERSION) }
                .ok_or_else(|| self.missing(symbols::ABI_VERSION))?;
        Ok(unsafe { version_fn() })
    }

    fn exports(&self, entry_point: EntryPoint) -> bool {
        unsafe { resolve::<unsafe extern "C" fn()>(&self.library, entry_point.native_symbol()) }
            .is_some()
    }

    fn instantiate(self: Box<Self>) -> std::result::Result<Box<dyn UnitInstance>, BindError> {
        let create: UnitCreateFn = unsafe { resolve(&self.library, symbols::CREATE) }
            .ok_or_else(|| self.missing(symbols::CREATE))?;
        let destroy: UnitDestroyFn = unsafe { resolve(&self.library, symbols::DESTROY) }
            .ok_or_else(|| self.missing(symbols::DESTROY))?;
        let initialize: UnitInitializeFn = unsafe { resolve(&self.library, symbols::INITIALIZE) }
            .ok_or_else(|| self.missing(symbols::INITIALIZE))?;
        let fire: UnitFireFn = unsafe { resolve(&self.library, symbols::FIRE) }
            .ok_or_else(|| self.missing(symbols::FIRE))?;
        let wrapup: UnitWrapupFn = unsafe { resolve(&self.library, symbols::WRAPUP) }
            .ok_or_else(|| self.missing(symbols::WRAPUP))?;

        let instance = unsafe { create() };
        if instance.is_null() {
            return Err(BindError::Instantiate {
                path: self.path.clone(),
                reason: format!("{} returned null", symbols::CREATE),
            });
        }

        let NativeArtifact { path, library } = *self;
        Ok(Box::new(NativeUnit {
            path,
            instance,
            destroy,
            initialize,
            fire,
            wrapup,
            _library: library,
        }))
    }
}

struct NativeUnit {
    path: PathBuf,
    instance: *mut c_void,
    destroy: UnitDestroyFn,
    initialize: UnitInitializeFn,
    fire: UnitFireFn,
    wrapup: UnitWrapupFn,
    // Declared last: dropped after `destroy` has run.
    _library: Library,
}

// SAFETY: the instance pointer is owned exclusively by this value and is only
// dereferenced by the unit through `&mut self` calls.
unsafe impl Send for NativeUnit {}

impl NativeUnit {
    fn check(&self, entry_point: EntryPoint, status: i32) -> Result<()> {
        if status == UNIT_OK {
            return Ok(());
        }
        Err(FlowError::UnitInvocation {
            unit: self.path.display().to_string(),
            entry_point: entry_point.name().to_string(),
            reason: format!("returned status {}", status),
        })
    }
}

impl UnitInstance for NativeUnit {
    fn initialize(&mut self) -> Result<()> {
        let status = unsafe { (self.initialize)(self.instance) };
        self.check(EntryPoint::Initialize, status)
    }

    fn fire(&mut self, inputs: &[PortBuffer], outputs: &[OutputShape]) -> Result<Vec<PortOutput>> {
        let mut input_storage: Vec<FlatBuffer> =
            inputs.iter().map(|b| FlatBuffer::from_rows(&b.rows)).collect();
        let mut output_storage = outputs
            .iter()
            .map(FlatBuffer::zeroed)
            .collect::<Result<Vec<_>>>()?;

        let input_views: Vec<UnitBuffer> = input_storage.iter_mut().map(FlatBuffer::view).collect();
        let mut output_views: Vec<UnitBuffer> =
            output_storage.iter_mut().map(FlatBuffer::view).collect();

        let status = unsafe {
            (self.fire)(
                self.instance,
                input_views.as_ptr(),
                input_views.len(),
                output_views.as_mut_ptr(),
                output_views.len(),
            )
        };
        self.check(EntryPoint::Fire, status)?;

        Ok(outputs
            .iter()
            .zip(output_storage)
            .map(|(shape, flat)| PortOutput::scalar(shape.port.clone(), flat.into_rows()))
            .collect())
    }

    fn wrapup(&mut self) -> Result<()> {
        let status = unsafe { (self.wrapup)(self.instance) };
        self.check(EntryPoint::Wrapup, status)
    }
}

impl Drop for NativeUnit {
    fn drop(&mut self) {
        unsafe { (self.destroy)(self.instance) };
    }
}

enum FlatData {
    Boolean(Vec<u8>),
    Int(Vec<i32>),
    Double(Vec<f64>),
}

/// Row-major `[channels][rate]` storage backing one [`UnitBuffer`].
struct FlatBuffer {
    data: FlatData,
    channels: usize,
    rate: usize,
}

impl FlatBuffer {
    fn from_rows(rows: &ChannelRows) -> Self {
        let channels = rows.channels();
        let rate = rows.row_lens().first().copied().unwrap_or(0);
        let data = match rows {
            ChannelRows::Boolean(r) => {
                FlatData::Boolean(r.iter().flatten().map(|&b| u8::from(b)).collect())
            }
            ChannelRows::Int(r) => FlatData::Int(r.iter().flatten().copied().collect()),
            ChannelRows::Double(r) => FlatData::Double(r.iter().flatten().copied().collect()),
        };
        Self {
            data,
            channels,
            rate,
        }
    }

    fn zeroed(shape: &OutputShape) -> Result<Self> {
        let len = shape.expected_values();
        let data = match &shape.port_type {
            PortType::Boolean => FlatData::Boolean(vec![0; len]),
            PortType::Int => FlatData::Int(vec![0; len]),
            PortType::Double => FlatData::Double(vec![0.0; len]),
            other => {
                return Err(FlowError::UnsupportedPortType {
                    port: shape.port.clone(),
                    port_type: other.to_string(),
                });
            }
        };
        Ok(Self {
            data,
            channels: shape.channels,
            rate: shape.rate,
        })
    }

    fn view(&mut self) -> UnitBuffer {
        let (kind, data) = match &mut self.data {
            FlatData::Boolean(v) => (UnitElementKind::Boolean, v.as_mut_ptr() as *mut c_void),
            FlatData::Int(v) => (UnitElementKind::Int, v.as_mut_ptr() as *mut c_void),
            FlatData::Double(v) => (UnitElementKind::Double, v.as_mut_ptr() as *mut c_void),
        };
        UnitBuffer {
            kind: kind as u32,
            channels: self.channels as u32,
            rate: self.rate as u32,
            data,
        }
    }

    fn into_rows(self) -> ChannelRows {
        let (channels, rate) = (self.channels, self.rate);
        match self.data {
            FlatData::Boolean(v) => ChannelRows::Boolean(
                split_rows(v, channels, rate)
                    .into_iter()
                    .map(|row| row.into_iter().map(|b| b != 0).collect())
                    .collect(),
            ),
            FlatData::Int(v) => ChannelRows::Int(split_rows(v, channels, rate)),
            FlatData::Double(v) => ChannelRows::Double(split_rows(v, channels, rate)),
        }
    }
}

fn split_rows<T: Clone>(values: Vec<T>, channels: usize, rate: usize) -> Vec<Vec<T>> {
    if rate == 0 {
        return vec![Vec::new(); channels];
    }
    values.chunks(rate).map(<[T]>::to_vec).collect()
}
