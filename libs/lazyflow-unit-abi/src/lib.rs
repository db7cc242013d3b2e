// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! ABI-stable interface for natively compiled lazyflow units.
//!
//! A compiled unit is the shared library a code generator produces for one
//! modular composite. The host binds to it by exported symbol name, so the
//! surface here is plain `extern "C"` functions and `#[repr(C)]` buffers.
//!
//! # Example Unit
//!
//! ```ignore
//! use lazyflow_unit_abi::{export_unit, GeneratedUnit, UnitBuffer, UNIT_OK};
//!
//! #[derive(Default)]
//! pub struct Scale;
//!
//! impl GeneratedUnit for Scale {
//!     fn fire(&mut self, inputs: &[UnitBuffer], outputs: &mut [UnitBuffer]) -> i32 {
//!         let input = unsafe { inputs[0].as_doubles() };
//!         let output = unsafe { outputs[0].as_doubles_mut() };
//!         for (o, i) in output.iter_mut().zip(input) {
//!             *o = i * 2.0;
//!         }
//!         UNIT_OK
//!     }
//! }
//!
//! export_unit!(Scale);
//! ```
//!
//! # Unit Cargo.toml
//!
//! ```toml
//! [lib]
//! crate-type = ["cdylib"]
//!
//! [dependencies]
//! lazyflow-unit-abi = "0.1"
//! ```

use std::ffi::c_void;

/// Current ABI version. Units must match this exactly.
///
/// Increment when making breaking changes to the unit interface.
pub const LAZYFLOW_UNIT_ABI_VERSION: u32 = 1;

/// Status code for a successful entry-point call.
pub const UNIT_OK: i32 = 0;

/// Status code returned when the host passes a null instance pointer.
pub const UNIT_ERR_NULL_INSTANCE: i32 = -1;

/// Status code returned when the host passes buffers the unit cannot read.
pub const UNIT_ERR_BAD_BUFFERS: i32 = -2;

/// Exported symbol names. The host resolves these by name after opening the
/// shared library.
pub mod symbols {
    pub const ABI_VERSION: &str = "lazyflow_unit_abi_version";
    pub const CREATE: &str = "lazyflow_unit_create";
    pub const DESTROY: &str = "lazyflow_unit_destroy";
    pub const INITIALIZE: &str = "lazyflow_unit_initialize";
    pub const FIRE: &str = "lazyflow_unit_fire";
    pub const WRAPUP: &str = "lazyflow_unit_wrapup";

    /// Entry points every unit must export for a bind to succeed.
    pub const REQUIRED_ENTRY_POINTS: [&str; 3] = [INITIALIZE, FIRE, WRAPUP];
}

pub type UnitAbiVersionFn = unsafe extern "C" fn() -> u32;
pub type UnitCreateFn = unsafe extern "C" fn() -> *mut c_void;
pub type UnitDestroyFn = unsafe extern "C" fn(instance: *mut c_void);
pub type UnitInitializeFn = unsafe extern "C" fn(instance: *mut c_void) -> i32;
pub type UnitWrapupFn = unsafe extern "C" fn(instance: *mut c_void) -> i32;

/// Fire entry point.
///
/// `inputs` holds one buffer per non-parameter input port, `outputs` one
/// pre-allocated buffer per output port, both in profile port order.
pub type UnitFireFn = unsafe extern "C" fn(
    instance: *mut c_void,
    inputs: *const UnitBuffer,
    input_count: usize,
    outputs: *mut UnitBuffer,
    output_count: usize,
) -> i32;

/// Element kind carried by a [`UnitBuffer`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitElementKind {
    /// One byte per element, `0` or `1`.
    Boolean = 0,
    Int = 1,
    Double = 2,
}

impl UnitElementKind {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Boolean),
            1 => Some(Self::Int),
            2 => Some(Self::Double),
            _ => None,
        }
    }

    pub fn element_size(self) -> usize {
        match self {
            Self::Boolean => std::mem::size_of::<u8>(),
            Self::Int => std::mem::size_of::<i32>(),
            Self::Double => std::mem::size_of::<f64>(),
        }
    }
}

/// A `[channels][rate]` block of scalars, stored row-major.
///
/// The memory behind `data` is owned by the host for the duration of one
/// fire call.
#[repr(C)]
#[derive(Debug)]
pub struct UnitBuffer {
    pub kind: u32,
    pub channels: u32,
    pub rate: u32,
    pub data: *mut c_void,
}

impl UnitBuffer {
    pub fn kind(&self) -> Option<UnitElementKind> {
        UnitElementKind::from_raw(self.kind)
    }

    /// Number of elements (`channels * rate`).
    pub fn len(&self) -> usize {
        self.channels as usize * self.rate as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// # Safety
    /// `data` must point to `len()` bytes of kind [`UnitElementKind::Boolean`].
    pub unsafe fn as_bools(&self) -> &[u8] {
        unsafe { self.slice::<u8>() }
    }

    /// # Safety
    /// `data` must point to `len()` elements of kind [`UnitElementKind::Int`].
    pub unsafe fn as_ints(&self) -> &[i32] {
        unsafe { self.slice::<i32>() }
    }

    /// # Safety
    /// `data` must point to `len()` elements of kind [`UnitElementKind::Double`].
    pub unsafe fn as_doubles(&self) -> &[f64] {
        unsafe { self.slice::<f64>() }
    }

    /// # Safety
    /// See [`UnitBuffer::as_bools`]; the buffer must also be writable.
    pub unsafe fn as_bools_mut(&mut self) -> &mut [u8] {
        unsafe { self.slice_mut::<u8>() }
    }

    /// # Safety
    /// See [`UnitBuffer::as_ints`]; the buffer must also be writable.
    pub unsafe fn as_ints_mut(&mut self) -> &mut [i32] {
        unsafe { self.slice_mut::<i32>() }
    }

    /// # Safety
    /// See [`UnitBuffer::as_doubles`]; the buffer must also be writable.
    pub unsafe fn as_doubles_mut(&mut self) -> &mut [f64] {
        unsafe { self.slice_mut::<f64>() }
    }

    unsafe fn slice<T>(&self) -> &[T] {
        if self.data.is_null() || self.is_empty() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.data as *const T, self.len()) }
    }

    unsafe fn slice_mut<T>(&mut self) -> &mut [T] {
        if self.data.is_null() || self.is_empty() {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.data as *mut T, self.len()) }
    }
}

/// Behaviour a generated unit implements. [`export_unit!`] turns it into the
/// exported C entry points.
pub trait GeneratedUnit: Default {
    fn initialize(&mut self) -> i32 {
        UNIT_OK
    }

    fn fire(&mut self, inputs: &[UnitBuffer], outputs: &mut [UnitBuffer]) -> i32;

    fn wrapup(&mut self) -> i32 {
        UNIT_OK
    }
}

/// Export a [`GeneratedUnit`] for dynamic binding.
///
/// Generates the `lazyflow_unit_*` symbols the host looks up by name. Only one
/// unit may be exported per shared library.
#[macro_export]
macro_rules! export_unit {
    ($unit:ty) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn lazyflow_unit_abi_version() -> u32 {
            $crate::LAZYFLOW_UNIT_ABI_VERSION
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn lazyflow_unit_create() -> *mut ::std::ffi::c_void {
            let unit: ::std::boxed::Box<$unit> =
                ::std::boxed::Box::new(<$unit as ::std::default::Default>::default());
            ::std::boxed::Box::into_raw(unit) as *mut ::std::ffi::c_void
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn lazyflow_unit_destroy(instance: *mut ::std::ffi::c_void) {
            if !instance.is_null() {
                drop(unsafe { ::std::boxed::Box::from_raw(instance as *mut $unit) });
            }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn lazyflow_unit_initialize(
            instance: *mut ::std::ffi::c_void,
        ) -> i32 {
            match unsafe { (instance as *mut $unit).as_mut() } {
                Some(unit) => $crate::GeneratedUnit::initialize(unit),
                None => $crate::UNIT_ERR_NULL_INSTANCE,
            }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn lazyflow_unit_fire(
            instance: *mut ::std::ffi::c_void,
            inputs: *const $crate::UnitBuffer,
            input_count: usize,
            outputs: *mut $crate::UnitBuffer,
            output_count: usize,
        ) -> i32 {
            let unit = match unsafe { (instance as *mut $unit).as_mut() } {
                Some(unit) => unit,
                None => return $crate::UNIT_ERR_NULL_INSTANCE,
            };
            if (inputs.is_null() && input_count > 0) || (outputs.is_null() && output_count > 0)
            {
                return $crate::UNIT_ERR_BAD_BUFFERS;
            }
            let inputs: &[$crate::UnitBuffer] = if input_count == 0 {
                &[]
            } else {
                unsafe { ::std::slice::from_raw_parts(inputs, input_count) }
            };
            let outputs: &mut [$crate::UnitBuffer] = if output_count == 0 {
                &mut []
            } else {
                unsafe { ::std::slice::from_raw_parts_mut(outputs, output_count) }
            };
            $crate::GeneratedUnit::fire(unit, inputs, outputs)
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn lazyflow_unit_wrapup(instance: *mut ::std::ffi::c_void) -> i32 {
            match unsafe { (instance as *mut $unit).as_mut() } {
                Some(unit) => $crate::GeneratedUnit::wrapup(unit),
                None => $crate::UNIT_ERR_NULL_INSTANCE,
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Accumulator {
        total: i32,
        initialized: bool,
    }

    impl GeneratedUnit for Accumulator {
        fn initialize(&mut self) -> i32 {
            self.initialized = true;
            self.total = 0;
            UNIT_OK
        }

        fn fire(&mut self, inputs: &[UnitBuffer], outputs: &mut [UnitBuffer]) -> i32 {
            if inputs.len() != 1 || outputs.len() != 1 {
                return UNIT_ERR_BAD_BUFFERS;
            }
            for value in unsafe { inputs[0].as_ints() } {
                self.total += value;
            }
            for slot in unsafe { outputs[0].as_ints_mut() } {
                *slot = self.total;
            }
            UNIT_OK
        }
    }

    export_unit!(Accumulator);

    #[test]
    fn test_element_kind_round_trip() {
        assert_eq!(UnitElementKind::from_raw(0), Some(UnitElementKind::Boolean));
        assert_eq!(UnitElementKind::from_raw(2), Some(UnitElementKind::Double));
        assert_eq!(UnitElementKind::from_raw(7), None);
        assert_eq!(UnitElementKind::Double.element_size(), 8);
    }

    #[test]
    fn test_empty_buffer_yields_empty_slice() {
        let buffer = UnitBuffer {
            kind: UnitElementKind::Int as u32,
            channels: 0,
            rate: 4,
            data: std::ptr::null_mut(),
        };
        assert!(buffer.is_empty());
        assert!(unsafe { buffer.as_ints() }.is_empty());
    }

    #[test]
    fn test_exported_entry_points_drive_unit() {
        assert_eq!(lazyflow_unit_abi_version(), LAZYFLOW_UNIT_ABI_VERSION);

        let instance = lazyflow_unit_create();
        assert!(!instance.is_null());
        assert_eq!(unsafe { lazyflow_unit_initialize(instance) }, UNIT_OK);

        let mut input_data = [1i32, 2, 3];
        let mut output_data = [0i32; 2];
        let inputs = [UnitBuffer {
            kind: UnitElementKind::Int as u32,
            channels: 1,
            rate: 3,
            data: input_data.as_mut_ptr() as *mut c_void,
        }];
        let mut outputs = [UnitBuffer {
            kind: UnitElementKind::Int as u32,
            channels: 2,
            rate: 1,
            data: output_data.as_mut_ptr() as *mut c_void,
        }];

        let status = unsafe {
            lazyflow_unit_fire(instance, inputs.as_ptr(), 1, outputs.as_mut_ptr(), 1)
        };
        assert_eq!(status, UNIT_OK);
        assert_eq!(output_data, [6, 6]);

        assert_eq!(unsafe { lazyflow_unit_wrapup(instance) }, UNIT_OK);
        unsafe { lazyflow_unit_destroy(instance) };
    }

    #[test]
    fn test_null_instance_is_rejected() {
        let status = unsafe { lazyflow_unit_initialize(std::ptr::null_mut()) };
        assert_eq!(status, UNIT_ERR_NULL_INSTANCE);
    }
}
