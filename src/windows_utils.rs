use std::{ffi::OsStr, os::windows::ffi::OsStrExt, path::Path, ptr};

use windows::{
    core::{Error, Interface, Result, PCWSTR},
    Win32::{
        Foundation::RPC_E_CHANGED_MODE,
        Graphics::Gdi::{
            CreateCompatibleDC, DeleteDC, DeleteObject, GetDIBits, GetObjectW, BITMAP, BITMAPINFO,
            BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HDC,
        },
        Storage::FileSystem::WIN32_FIND_DATAW,
        System::{
            Com::{
                CoCreateInstance, CoInitializeEx, CoUninitialize, IPersistFile,
                CLSCTX_INPROC_SERVER, COINIT_APARTMENTTHREADED, STGM_READ,
            },
            Environment::ExpandEnvironmentStringsW,
        },
        UI::{
            Shell::{ExtractIconExW, IShellLinkW, ShellLink, SLGP_RAWPATH, SLGP_UNCPRIORITY},
            WindowsAndMessaging::{DestroyIcon, GetIconInfo, HICON, ICONINFO},
        },
    },
};

use crate::scanner::start_menu::ShortcutInfo;

/// RAII guard for COM initialization on the current thread.
pub(crate) struct ComGuard {
    initialized: bool,
}

impl ComGuard {
    /// Initializes COM in STA mode if needed.
    pub(crate) unsafe fn new() -> Result<Self> {
        let hr = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
        if hr.is_ok() {
            Ok(Self { initialized: true })
        } else if hr == RPC_E_CHANGED_MODE {
            Ok(Self { initialized: false })
        } else {
            Err(Error::from(hr))
        }
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        if self.initialized {
            unsafe {
                CoUninitialize();
            }
        }
    }
}

/// Resolves a `.lnk` shortcut into its target, working directory and icon location.
pub(crate) fn resolve_shell_link(path: &Path) -> Option<ShortcutInfo> {
    unsafe {
        let _guard = ComGuard::new().ok()?;
        let shell_link: IShellLinkW =
            CoCreateInstance(&ShellLink, None, CLSCTX_INPROC_SERVER).ok()?;
        let persist: IPersistFile = shell_link.cast().ok()?;
        let wide_path = os_str_to_wide(path.as_os_str());
        persist.Load(PCWSTR(wide_path.as_ptr()), STGM_READ).ok()?;

        const BUFFER_LEN: usize = 1024;
        let mut shortcut = ShortcutInfo::default();

        let mut target_buffer = vec![0u16; BUFFER_LEN];
        let path_flags = (SLGP_UNCPRIORITY.0 | SLGP_RAWPATH.0) as u32;
        if shell_link
            .GetPath(
                target_buffer.as_mut_slice(),
                ptr::null_mut::<WIN32_FIND_DATAW>(),
                path_flags,
            )
            .is_ok()
        {
            shortcut.target_path = wide_to_string(&target_buffer).unwrap_or_default();
        }

        let mut working_dir_buffer = vec![0u16; BUFFER_LEN];
        if shell_link
            .GetWorkingDirectory(working_dir_buffer.as_mut_slice())
            .is_ok()
        {
            shortcut.working_directory = wide_to_string(&working_dir_buffer).unwrap_or_default();
        }

        let mut icon_buffer = vec![0u16; BUFFER_LEN];
        let mut icon_index = 0i32;
        if shell_link
            .GetIconLocation(icon_buffer.as_mut_slice(), &mut icon_index)
            .is_ok()
        {
            shortcut.icon_path = wide_to_string(&icon_buffer).unwrap_or_default();
        }

        Some(shortcut)
    }
}

/// Converts an [`OsStr`] into a null-terminated wide string buffer suitable for Win32 APIs.
pub(crate) fn os_str_to_wide(value: &OsStr) -> Vec<u16> {
    value.encode_wide().chain(Some(0)).collect()
}

/// Trims trailing null terminators and converts a UTF-16 buffer into a [`String`].
pub(crate) fn wide_to_string(buffer: &[u16]) -> Option<String> {
    let end = buffer.iter().position(|c| *c == 0).unwrap_or(buffer.len());
    if end == 0 {
        return None;
    }

    String::from_utf16(&buffer[..end]).ok()
}

/// Expands Windows environment variables (e.g. `%SystemRoot%`).
pub(crate) fn expand_env_vars(value: &str) -> Option<String> {
    if !value.contains('%') {
        return Some(value.to_string());
    }

    let wide_input = os_str_to_wide(OsStr::new(value));
    unsafe {
        let required = ExpandEnvironmentStringsW(PCWSTR(wide_input.as_ptr()), None);
        if required == 0 {
            return None;
        }

        let mut buffer = vec![0u16; required as usize];
        let written = ExpandEnvironmentStringsW(PCWSTR(wide_input.as_ptr()), Some(&mut buffer));
        if written == 0 {
            return None;
        }

        wide_to_string(&buffer)
    }
}

/// Pulls the first small icon out of `path` as `(width, height, rgba)`.
///
/// The HICON and both of its bitmaps are released before returning.
pub(crate) fn extract_small_icon_rgba(path: &str) -> Option<(u32, u32, Vec<u8>)> {
    let wide_path = os_str_to_wide(OsStr::new(path));
    let mut icon = HICON::default();

    unsafe {
        let extracted = ExtractIconExW(PCWSTR(wide_path.as_ptr()), 0, None, Some(&mut icon), 1);
        if extracted == 0 || icon.is_invalid() {
            return None;
        }

        let pixels = icon_to_rgba(icon);
        let _ = DestroyIcon(icon);
        pixels
    }
}

unsafe fn icon_to_rgba(icon: HICON) -> Option<(u32, u32, Vec<u8>)> {
    let mut icon_info: ICONINFO = std::mem::zeroed();
    if GetIconInfo(icon, &mut icon_info).is_err() {
        return None;
    }

    let pixels = bitmap_pixels(&icon_info);
    cleanup_icon(&icon_info);
    pixels
}

unsafe fn bitmap_pixels(icon_info: &ICONINFO) -> Option<(u32, u32, Vec<u8>)> {
    let color_bitmap = if !icon_info.hbmColor.is_invalid() {
        icon_info.hbmColor
    } else {
        icon_info.hbmMask
    };
    if color_bitmap.is_invalid() {
        return None;
    }

    let mut bitmap: BITMAP = std::mem::zeroed();
    if GetObjectW(
        color_bitmap,
        std::mem::size_of::<BITMAP>() as i32,
        Some(&mut bitmap as *mut _ as *mut _),
    ) == 0
    {
        return None;
    }

    let width = bitmap.bmWidth;
    let mut height = bitmap.bmHeight;
    // Monochrome icons stack the AND and XOR masks vertically.
    if icon_info.hbmColor.is_invalid() {
        height /= 2;
    }
    if width <= 0 || height <= 0 {
        return None;
    }

    let mut info: BITMAPINFO = std::mem::zeroed();
    info.bmiHeader.biSize = std::mem::size_of::<BITMAPINFOHEADER>() as u32;
    info.bmiHeader.biWidth = width;
    info.bmiHeader.biHeight = -height; // top-down DIB
    info.bmiHeader.biPlanes = 1;
    info.bmiHeader.biBitCount = 32;
    info.bmiHeader.biCompression = BI_RGB.0;

    let dc = CreateCompatibleDC(HDC::default());
    if dc.is_invalid() {
        return None;
    }

    let mut pixels = vec![0u8; (width * height * 4) as usize];
    let copied = GetDIBits(
        dc,
        color_bitmap,
        0,
        height as u32,
        Some(pixels.as_mut_ptr() as *mut _),
        &mut info,
        DIB_RGB_COLORS,
    );
    let _ = DeleteDC(dc);
    if copied == 0 {
        return None;
    }

    // Convert BGRA -> RGBA
    for chunk in pixels.chunks_exact_mut(4) {
        chunk.swap(0, 2);
    }

    Some((width as u32, height as u32, pixels))
}

unsafe fn cleanup_icon(info: &ICONINFO) {
    if !info.hbmColor.is_invalid() {
        let _ = DeleteObject(info.hbmColor);
    }
    if !info.hbmMask.is_invalid() {
        let _ = DeleteObject(info.hbmMask);
    }
}
