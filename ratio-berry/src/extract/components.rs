use super::{neighbour4, neighbour8, ExtractError, ParticleExtractor};
use crate::config::AreaBounds;
use crate::consts::gray::*;
use crate::data::slice::RasterIter;
use crate::data::{MaskSlice, Rect};
use crate::{Area2d, Idx2d, Region};
use ndarray::Array2;
use std::collections::{HashMap, VecDeque};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 像素连通规则.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Connectivity {
    /// 4-相邻.
    Four,

    /// 8-相邻.
    #[default]
    Eight,
}

impl Connectivity {
    /// 与之互补的连通规则, 用于判定背景 (孔洞) 的连通性.
    #[inline]
    pub fn complement(self) -> Self {
        match self {
            Self::Four => Self::Eight,
            Self::Eight => Self::Four,
        }
    }
}

/// 按连通规则获得 `pos` 的邻居索引. 不检查越界.
fn neighbours(connectivity: Connectivity, pos: Idx2d) -> impl Iterator<Item = Idx2d> {
    let (n4, n8) = match connectivity {
        Connectivity::Four => (Some(neighbour4(pos)), None),
        Connectivity::Eight => (None, Some(neighbour8(pos))),
    };
    n4.into_iter()
        .flatten()
        .chain(n8.into_iter().flatten())
}

/// 掩膜解释方式.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MaskMode {
    /// 任何非零像素都是前景, 前景像素互相连通.
    #[default]
    Binary,

    /// 每个非零值代表一种标签, 只有值相同的像素互相连通.
    Labeled,
}

/// 连通域提取选项.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExtractOptions {
    /// 连通规则.
    pub connectivity: Connectivity,

    /// 掩膜解释方式.
    pub mask_mode: MaskMode,

    /// 是否丢弃接触平面边缘的区域.
    pub exclude_edges: bool,

    /// 是否把区域内部的孔洞 (被区域包围的背景像素) 并入区域.
    ///
    /// 粗略面积过滤始终使用填充前的像素个数.
    pub fill_holes: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::Eight,
            mask_mode: MaskMode::Binary,
            exclude_edges: true,
            fill_holes: true,
        }
    }
}

/// 基于广度优先搜索的连通域提取器.
///
/// 按行优先顺序扫描种子像素, 因此区域按其最上 (其次最左) 像素排序.
/// 标签格式为 `SSSS-YYYY-XXXX`, 依次为切片编号与包围盒中心的行、列;
/// 重复的标签会追加 `-N` 后缀.
#[derive(Debug, Clone, Default)]
pub struct ConnectedComponents {
    options: ExtractOptions,
    issued: HashMap<String, usize>,
}

impl ConnectedComponents {
    /// 以给定选项初始化.
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            issued: HashMap::new(),
        }
    }

    /// 当前选项.
    #[inline]
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// 获取 `plane` 中所有的连通区域, 不做任何过滤.
    /// 第二个返回值表示该区域是否接触平面边缘.
    pub fn components(&self, plane: &MaskSlice) -> Vec<(Area2d, bool)> {
        let mut ans = Vec::new();
        let mut visited = Array2::from_elem(plane.shape(), false);
        let mut bfs_q = VecDeque::with_capacity(8);

        for seed in plane.pos_iter() {
            let seed_value = plane[seed];
            if visited[seed] || is_background(seed_value) {
                continue;
            }
            let connects = |p: u8| match self.options.mask_mode {
                MaskMode::Binary => is_foreground(p),
                MaskMode::Labeled => p == seed_value,
            };

            let mut this_area = Area2d::with_capacity(4);
            let mut at_edge = false;
            visited[seed] = true;
            bfs_q.push_back(seed);
            while let Some(cur) = bfs_q.pop_front() {
                this_area.push(cur);
                at_edge |= plane.is_at_border(cur);
                for next in neighbours(self.options.connectivity, cur) {
                    if plane.get(next).is_some_and(|&p| connects(p)) && !visited[next] {
                        visited[next] = true;
                        bfs_q.push_back(next);
                    }
                }
            }
            ans.push((this_area, at_edge));
        }
        ans
    }

    /// 在包围盒 `rect` 内构建 `area` 的掩膜, 并补上其中的孔洞.
    ///
    /// 从包围盒边缘出发, 经非区域像素无法到达的位置即为孔洞. 背景按与前景互补的
    /// 规则连通. 孔洞中属于其他区域的前景像素不会被并入.
    fn filled_mask(&self, plane: &MaskSlice, area: &Area2d, rect: Rect) -> Array2<bool> {
        let ((h0, w0), (rh, rw)) = (rect.origin, rect.shape);
        let mut inside = Array2::from_elem(rect.shape, false);
        for &(h, w) in area {
            inside[(h - h0, w - w0)] = true;
        }

        let mut outside = Array2::from_elem(rect.shape, false);
        let mut bfs_q: VecDeque<Idx2d> = RasterIter::new(rect.shape)
            .filter(|&(h, w)| (h == 0 || w == 0 || h + 1 == rh || w + 1 == rw) && !inside[(h, w)])
            .collect();
        for &pos in &bfs_q {
            outside[pos] = true;
        }
        let connectivity = self.options.connectivity.complement();
        while let Some(cur) = bfs_q.pop_front() {
            for next in neighbours(connectivity, cur) {
                if inside.get(next).is_some_and(|&b| !b) && !outside[next] {
                    outside[next] = true;
                    bfs_q.push_back(next);
                }
            }
        }

        for ((h, w), px) in inside.indexed_iter_mut() {
            if !*px && !outside[(h, w)] && is_background(plane[(h + h0, w + w0)]) {
                *px = true;
            }
        }
        inside
    }

    /// 生成运行内唯一的标签.
    fn issue_label(&mut self, slice_number: usize, bounds: &Rect) -> String {
        let (cy, cx) = bounds.center();
        let base = format!("{slice_number:04}-{cy:04}-{cx:04}");
        let seen = self.issued.entry(base.clone()).or_default();
        *seen += 1;
        match *seen {
            1 => base,
            n => format!("{base}-{n}"),
        }
    }
}

impl ParticleExtractor for ConnectedComponents {
    fn extract(
        &mut self,
        plane: &MaskSlice,
        slice_number: usize,
        bounds: AreaBounds,
    ) -> Result<Vec<Region>, ExtractError> {
        let mut regions = Vec::new();
        for (area, at_edge) in self.components(plane) {
            if at_edge && self.options.exclude_edges {
                log::trace!("slice {slice_number}: drop edge region of {} px", area.len());
                continue;
            }
            if !bounds.contains(area.len()) {
                log::trace!("slice {slice_number}: drop region of {} px", area.len());
                continue;
            }
            let Some(rect) = Rect::bounding(&area) else {
                continue;
            };
            let label = self.issue_label(slice_number, &rect);
            let region = if self.options.fill_holes {
                let mask = self.filled_mask(plane, &area, rect);
                Region::new(label, Some(slice_number), rect, mask)
            } else {
                Region::from_positions(label, Some(slice_number), &area)
            };
            regions.push(region);
        }
        Ok(regions)
    }
}
