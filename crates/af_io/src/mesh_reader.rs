// crates/af_io/src/mesh_reader.rs

//! JSON 原始网格读写
//!
//! [`RawMesh`] 带 serde 派生，原生格式即其 JSON 序列化。
//! 读取后立即做索引/元数校验，满足网格加载器契约。

use std::path::Path;

use af_mesh::RawMesh;

use crate::error::{IoError, IoResult};

/// 读取 JSON 原始网格并校验
pub fn read_raw_mesh(path: &Path) -> IoResult<RawMesh> {
    let text = std::fs::read_to_string(path)?;
    let mesh: RawMesh = serde_json::from_str(&text)?;
    mesh.validate()
        .map_err(|e| IoError::Format(format!("网格校验失败: {e}")))?;
    tracing::debug!(
        path = %path.display(),
        n_points = mesh.n_points(),
        n_elements = mesh.elements.len(),
        "网格已读取"
    );
    Ok(mesh)
}

/// 写出 JSON 原始网格
pub fn write_raw_mesh(path: &Path, mesh: &RawMesh) -> IoResult<()> {
    let text = serde_json::to_string(mesh)?;
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_mesh::generation::RectMeshGenerator;

    #[test]
    fn test_roundtrip() {
        let dir = std::env::temp_dir().join("af_io_mesh_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("mesh.json");

        let mesh = RectMeshGenerator::new(3, 3, 1.0, 1.0).build();
        write_raw_mesh(&path, &mesh).unwrap();
        let loaded = read_raw_mesh(&path).unwrap();
        assert_eq!(loaded.points, mesh.points);
        assert_eq!(loaded.elements.len(), mesh.elements.len());
        assert_eq!(loaded.markers.len(), 4);
    }

    #[test]
    fn test_invalid_mesh_rejected() {
        let dir = std::env::temp_dir().join("af_io_mesh_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        std::fs::write(&path, "{ \"n_dim\": 2 }").unwrap();
        assert!(read_raw_mesh(&path).is_err());
    }
}
