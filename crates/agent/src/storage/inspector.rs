/// 镜像查询抽象层

use async_trait::async_trait;
use common::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 镜像查询 Trait
#[async_trait]
pub trait ImageInspector: Send + Sync + 'static {
    /// 返回镜像实际占用的容量文本，例如 `196K` 或 `1.5 GiB`
    async fn disk_size(&self, path: &Path) -> Result<String>;

    /// 获取查询工具类型
    fn inspector_type(&self) -> &str;
}

/// 查找实例某个磁盘角色的后端文件
///
/// 依次尝试 `<instances_dir>/<name>/<role>` 和 `<instances_dir>/<uuid>/<role>`，
/// 都不存在时返回 `None`。
pub fn resolve_backing_file(instances_dir: &Path, name: &str, uuid: &str, role: &str) -> Option<PathBuf> {
    [name, uuid]
        .iter()
        .map(|dir| instances_dir.join(dir).join(role))
        .find(|path| path.exists())
        .map(|path| {
            debug!("后端磁盘文件: {:?}", path);
            path
        })
}
