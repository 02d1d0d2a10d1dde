// build.rs
// Compiles the GLSL sources under resources/shaders into SPIR-V next to the workspace target dir

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Locate glslc: Vulkan SDK first, then whatever is on PATH
fn find_glslc() -> Option<String> {
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");

    if let Ok(sdk) = env::var("VULKAN_SDK") {
        let glslc = if cfg!(target_os = "windows") {
            format!("{}\\Bin\\glslc.exe", sdk)
        } else {
            format!("{}/bin/glslc", sdk)
        };
        if Path::new(&glslc).exists() {
            return Some(glslc);
        }
        eprintln!("warning: glslc not found at: {}", glslc);
    }

    // Fall back to PATH lookup
    match Command::new("glslc").arg("--version").output() {
        Ok(output) if output.status.success() => Some("glslc".to_string()),
        _ => None,
    }
}

fn main() {
    // Tell cargo to rerun this build script if any shader files change
    println!("cargo:rerun-if-changed=../../resources/shaders");

    // Allow skipping shader compilation with an env var
    println!("cargo:rerun-if-env-changed=SKIP_SHADERS");
    if env::var("SKIP_SHADERS").is_ok() {
        eprintln!("info: Skipping shader compilation (SKIP_SHADERS set)");
        return;
    }

    let Some(glslc) = find_glslc() else {
        eprintln!("warning: glslc not available, shader compilation skipped");
        eprintln!("hint: Install the Vulkan SDK or put glslc on PATH");
        return;
    };

    let shader_dir = PathBuf::from("../../resources/shaders");
    let target_dir = PathBuf::from("../../target/shaders");

    if let Err(e) = std::fs::create_dir_all(&target_dir) {
        eprintln!("warning: Failed to create target directory: {}", e);
        return;
    }

    let shader_files = match std::fs::read_dir(&shader_dir) {
        Ok(files) => files,
        Err(_) => {
            eprintln!("info: No shader directory found at: {:?}", shader_dir);
            return;
        }
    };

    let mut compiled_count = 0;
    for entry in shader_files.flatten() {
        let path = entry.path();
        let is_stage = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("vert" | "frag")
        );
        if !is_stage {
            continue;
        }

        // triangle.vert -> triangle.vert.spv so both stages of a program can coexist
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let out_file = target_dir.join(format!("{}.spv", file_name));

        let needs_compile = match (std::fs::metadata(&path), std::fs::metadata(&out_file)) {
            (Ok(src_meta), Ok(dst_meta)) => match (src_meta.modified(), dst_meta.modified()) {
                (Ok(src), Ok(dst)) => src > dst,
                _ => true,
            },
            _ => true,
        };

        if !needs_compile {
            eprintln!("info: Shader {} is up to date", file_name);
            continue;
        }

        let status = Command::new(&glslc).arg(&path).arg("-o").arg(&out_file).status();
        match status {
            Ok(s) if s.success() => {
                eprintln!("info: Compiled {} -> {:?}", file_name, out_file);
                compiled_count += 1;
            }
            Ok(s) => {
                eprintln!("error: glslc failed for {:?} with exit code: {}", path, s.code().unwrap_or(-1));
                panic!("Shader compilation failed");
            }
            Err(e) => {
                eprintln!("error: Failed to run glslc for {:?}: {}", path, e);
                panic!("Failed to execute shader compiler");
            }
        }
    }

    eprintln!("info: Compiled {} shader(s)", compiled_count);
}
