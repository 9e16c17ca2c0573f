/// 实例注册表
///
/// 扫描 libvirt 的域定义目录（例如 /etc/libvirt/qemu/instance-*.xml），
/// 从每个定义文件中取出 `<uuid>`，文件名（去掉扩展名）即实例名。
/// 单个文件解析失败只会让该实例被跳过，目录本身无法读取才是致命错误。

use common::{Error, Instance, Result};
use roxmltree::Document;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

pub struct InstanceRegistry {
    /// 定义文件目录
    definitions_dir: PathBuf,
    /// 只读取以此前缀开头的定义文件
    prefix: String,
}

impl InstanceRegistry {
    pub fn new(definitions_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            definitions_dir: definitions_dir.into(),
            prefix: prefix.into(),
        }
    }

    /// 按目录列举顺序返回所有可识别的实例
    pub async fn load(&self) -> Result<Vec<Instance>> {
        debug!("扫描实例定义目录: {:?}", self.definitions_dir);

        let mut entries = fs::read_dir(&self.definitions_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("无法读取实例定义目录 {:?}: {}", self.definitions_dir, e),
            ))
        })?;

        let mut instances = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            // 定义文件可能是指向其他目录的符号链接
            let is_file = match entry.file_type().await {
                Ok(kind) if kind.is_symlink() => fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false),
                Ok(kind) => kind.is_file(),
                Err(_) => false,
            };
            if !is_file {
                continue;
            }

            let Some(name) = self.definition_name(&path) else {
                continue;
            };

            let content = match fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("读取定义文件 {:?} 失败，跳过: {}", path, e);
                    continue;
                }
            };

            match parse_definition(&name, &content) {
                Ok(instance) => instances.push(instance),
                Err(e) => warn!("定义文件 {:?} 无法识别，跳过: {}", path, e),
            }
        }

        info!("发现 {} 个实例", instances.len());
        Ok(instances)
    }

    /// 符合 `<prefix>*.xml` 的文件返回实例名
    fn definition_name(&self, path: &Path) -> Option<String> {
        if path.extension().and_then(|ext| ext.to_str()) != Some("xml") {
            return None;
        }

        let stem = path.file_stem()?.to_str()?.trim();
        if stem.is_empty() || !stem.starts_with(&self.prefix) {
            return None;
        }

        Some(stem.to_string())
    }
}

/// 从域定义 XML 中解析实例
///
/// 优先取根元素下的 `<uuid>`，没有时退回到文档中第一个 `<uuid>`。
pub fn parse_definition(name: &str, xml: &str) -> Result<Instance> {
    let doc = Document::parse(xml)
        .map_err(|e| Error::Format(format!("解析XML失败: {}", e)))?;

    let root = doc.root_element();
    let node = root
        .children()
        .find(|n| n.tag_name().name() == "uuid")
        .or_else(|| doc.descendants().find(|n| n.tag_name().name() == "uuid"))
        .ok_or_else(|| Error::NotFound(format!("{} 缺少 <uuid>", name)))?;

    let text = node.text().map(str::trim).unwrap_or_default();
    let uuid = uuid::Uuid::parse_str(text)
        .map_err(|e| Error::Format(format!("{} 的 uuid 无效 {:?}: {}", name, text, e)))?;

    Ok(Instance::new(name, uuid.hyphenated().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const UUID: &str = "8f2c3a1e-5b7d-4c9a-9e61-2d4b7f0a3c11";

    fn domain_xml(name: &str, uuid: &str) -> String {
        format!(
            r#"<!--
WARNING: THIS IS AN AUTO-GENERATED FILE. CHANGES TO IT ARE LIKELY TO BE
OVERWRITTEN AND LOST.
-->
<domain type='kvm'>
  <name>{}</name>
  <uuid>
    {}
  </uuid>
  <memory unit='KiB'>1048576</memory>
  <devices>
    <disk type='file' device='disk'>
      <source file='/var/lib/nova/instances/{}/disk'/>
      <target dev='vda' bus='virtio'/>
    </disk>
  </devices>
</domain>
"#,
            name, uuid, uuid
        )
    }

    #[test]
    fn test_parse_definition() {
        let instance = parse_definition("instance-0000002a", &domain_xml("instance-0000002a", UUID)).unwrap();
        assert_eq!(instance, Instance::new("instance-0000002a", UUID));
    }

    #[test]
    fn test_parse_definition_normalizes_uuid() {
        let xml = "<domain><uuid>8F2C3A1E5B7D4C9A9E612D4B7F0A3C11</uuid></domain>";
        let instance = parse_definition("instance-1", xml).unwrap();
        assert_eq!(instance.uuid, UUID);
    }

    #[test]
    fn test_parse_definition_missing_uuid() {
        let err = parse_definition("instance-1", "<domain><name>instance-1</name></domain>").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = parse_definition("instance-1", "<domain><uuid>not-a-uuid</uuid></domain>").unwrap_err();
        assert!(matches!(err, Error::Format(_)));

        let err = parse_definition("instance-1", "<domain><uuid>").unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[tokio::test]
    async fn test_load_skips_bad_records() {
        let dir = tempdir().unwrap();
        let other = "0b6d7a4e-1c2f-4e3a-8d5b-6f7e8a9b0c1d";

        std::fs::write(dir.path().join("instance-00000001.xml"), domain_xml("instance-00000001", UUID)).unwrap();
        std::fs::write(dir.path().join("instance-00000002.xml"), domain_xml("instance-00000002", other)).unwrap();
        std::fs::write(dir.path().join("instance-00000003.xml"), "<domain><name>broken</name></domain>").unwrap();
        std::fs::write(dir.path().join("router.xml"), domain_xml("router", UUID)).unwrap();
        std::fs::write(dir.path().join("instance-00000004.xml.bak"), domain_xml("x", UUID)).unwrap();
        std::fs::create_dir(dir.path().join("instance-autostart.xml")).unwrap();

        let registry = InstanceRegistry::new(dir.path(), "instance-");
        let mut instances = registry.load().await.unwrap();
        instances.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(
            instances,
            vec![
                Instance::new("instance-00000001", UUID),
                Instance::new("instance-00000002", other),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_load_follows_symlinked_definitions() {
        let dir = tempdir().unwrap();
        let store = tempdir().unwrap();

        let target = store.path().join("instance-00000009.xml");
        std::fs::write(&target, domain_xml("instance-00000009", UUID)).unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("instance-00000009.xml")).unwrap();
        std::os::unix::fs::symlink(store.path().join("gone.xml"), dir.path().join("instance-0000000a.xml")).unwrap();

        let registry = InstanceRegistry::new(dir.path(), "instance-");
        let instances = registry.load().await.unwrap();
        assert_eq!(instances, vec![Instance::new("instance-00000009", UUID)]);
    }

    #[tokio::test]
    async fn test_load_missing_directory_is_fatal() {
        let dir = tempdir().unwrap();
        let registry = InstanceRegistry::new(dir.path().join("missing"), "instance-");
        assert!(matches!(registry.load().await, Err(Error::Io(_))));
    }
}
