// crates/af_mesh/src/coloring.rs

//! 边着色
//!
//! 贪心图着色：同一颜色组内任意两条边不共享单元，
//! 因此组内可以无冲突并行写入残差与 Jacobian 非对角块。
//! 颜色组边界即同步点。

use crate::geometry::DualGeometry;

/// 边着色结果
#[derive(Debug, Clone)]
pub struct EdgeColoring {
    /// 按颜色分组的边索引
    pub groups: Vec<Vec<u32>>,
    /// 每条边的颜色
    pub edge_colors: Vec<u16>,
}

impl EdgeColoring {
    /// 贪心构建：对每条边取两端单元均未占用的最小颜色
    pub fn build(geometry: &DualGeometry) -> Self {
        let n_edges = geometry.n_edges();
        let n_cells = geometry.n_cells();

        // 每单元的颜色占用位图（64 色以内走快路径）
        let mut cell_mask = vec![0u64; n_cells];
        let mut cell_overflow: Vec<Vec<u16>> = vec![Vec::new(); n_cells];
        let mut edge_colors = vec![0u16; n_edges];
        let mut n_colors = 0u16;

        for e in 0..n_edges {
            let edge = geometry.edge(e);
            let (i, j) = (edge.cell_i, edge.cell_j);

            let used = cell_mask[i] | cell_mask[j];
            let color = if used != u64::MAX {
                (!used).trailing_zeros() as u16
            } else {
                // 罕见：两端合计占满 64 色，线性探测溢出表
                let mut c = 64u16;
                loop {
                    if !cell_overflow[i].contains(&c) && !cell_overflow[j].contains(&c) {
                        break c;
                    }
                    c += 1;
                }
            };

            if color < 64 {
                cell_mask[i] |= 1u64 << color;
                cell_mask[j] |= 1u64 << color;
            } else {
                cell_overflow[i].push(color);
                cell_overflow[j].push(color);
            }
            edge_colors[e] = color;
            n_colors = n_colors.max(color + 1);
        }

        let mut groups = vec![Vec::new(); n_colors as usize];
        for (e, &c) in edge_colors.iter().enumerate() {
            groups[c as usize].push(e as u32);
        }

        Self {
            groups,
            edge_colors,
        }
    }

    /// 颜色数
    pub fn n_colors(&self) -> usize {
        self.groups.len()
    }

    /// 校验：组内无共享单元（调试用）
    pub fn is_conflict_free(&self, geometry: &DualGeometry) -> bool {
        for group in &self.groups {
            let mut seen = vec![false; geometry.n_cells()];
            for &e in group {
                let edge = geometry.edge(e as usize);
                if seen[edge.cell_i] || seen[edge.cell_j] {
                    return false;
                }
                seen[edge.cell_i] = true;
                seen[edge.cell_j] = true;
            }
        }
        true
    }
}
