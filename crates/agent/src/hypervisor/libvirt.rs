/// libvirt 绑定后端
///
/// 直接通过 libvirt API 查询，再按 virsh 的输出格式渲染文本，
/// 这样两种后端共用同一套解析逻辑。

use async_trait::async_trait;
use common::{Error, Result};
use std::fmt::Write;
use std::sync::Arc;
use tokio::sync::Mutex;
use virt::connect::Connect;
use virt::domain::Domain;

use super::Hypervisor;

// libvirt 域状态常量
const VIR_DOMAIN_NOSTATE: u32 = 0;
const VIR_DOMAIN_RUNNING: u32 = 1;
const VIR_DOMAIN_BLOCKED: u32 = 2;
const VIR_DOMAIN_PAUSED: u32 = 3;
const VIR_DOMAIN_SHUTDOWN: u32 = 4;
const VIR_DOMAIN_SHUTOFF: u32 = 5;
const VIR_DOMAIN_CRASHED: u32 = 6;
const VIR_DOMAIN_PMSUSPENDED: u32 = 7;

pub struct LibvirtHypervisor {
    conn: Arc<Mutex<Connect>>,
}

impl LibvirtHypervisor {
    pub fn connect(uri: &str) -> Result<Self> {
        let conn = Connect::open(Some(uri))
            .map_err(|e| Error::SourceUnavailable(format!("无法连接到 libvirt: {}", e)))?;

        tracing::info!("✅ 成功连接到 libvirt: {}", uri);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 通过名称或 UUID 查找域
    fn lookup(conn: &Connect, name: &str) -> Result<Domain> {
        Domain::lookup_by_name(conn, name)
            .or_else(|_| Domain::lookup_by_uuid_string(conn, name))
            .map_err(|e| Error::SourceUnavailable(format!("虚拟机不存在: {} ({})", name, e)))
    }
}

/// 与 virsh 一致的状态名称
fn state_name(state: u32) -> &'static str {
    match state {
        VIR_DOMAIN_NOSTATE => "no state",
        VIR_DOMAIN_RUNNING => "running",
        VIR_DOMAIN_BLOCKED => "idle",
        VIR_DOMAIN_PAUSED => "paused",
        VIR_DOMAIN_SHUTDOWN => "in shutdown",
        VIR_DOMAIN_SHUTOFF => "shut off",
        VIR_DOMAIN_CRASHED => "crashed",
        VIR_DOMAIN_PMSUSPENDED => "pmsuspended",
        _ => "unknown",
    }
}

/// 从域 XML 中提取网卡，渲染为 `virsh domiflist` 表格
fn render_interface_list(xml: &str) -> Result<String> {
    use roxmltree::Document;

    let doc = Document::parse(xml)
        .map_err(|e| Error::Format(format!("解析XML失败: {}", e)))?;

    let mut out = String::new();
    let _ = writeln!(out, " Interface   Type   Source   Model   MAC");
    let _ = writeln!(out, "-------------------------------------------------------");

    for node in doc.descendants().filter(|n| n.tag_name().name() == "interface") {
        let child = |tag: &str| node.children().find(|n| n.tag_name().name() == tag);

        let Some(dev) = child("target").and_then(|t| t.attribute("dev")) else {
            continue;
        };
        let kind = node.attribute("type").unwrap_or("-");
        let source = child("source")
            .and_then(|s| s.attribute("bridge").or_else(|| s.attribute("network")))
            .unwrap_or("-");
        let model = child("model").and_then(|m| m.attribute("type")).unwrap_or("-");
        let mac = child("mac").and_then(|m| m.attribute("address")).unwrap_or("-");

        let _ = writeln!(out, " {}   {}   {}   {}   {}", dev, kind, source, model, mac);
    }

    Ok(out)
}

fn render_counters(device: &str, counters: &[(&str, i64)]) -> String {
    let mut out = String::new();
    for (metric, value) in counters {
        // libvirt 用 -1 表示该计数器不可用，virsh 会直接略过
        if *value >= 0 {
            let _ = writeln!(out, "{} {} {}", device, metric, value);
        }
    }
    out
}

#[async_trait]
impl Hypervisor for LibvirtHypervisor {
    async fn domain_info(&self, name: &str) -> Result<String> {
        let conn = self.conn.lock().await;
        let domain = Self::lookup(&conn, name)?;

        let info = domain
            .get_info()
            .map_err(|e| Error::SourceUnavailable(format!("无法获取虚拟机信息: {}", e)))?;

        let mut out = String::new();
        let _ = writeln!(out, "Name:           {}", name);
        let _ = writeln!(out, "State:          {}", state_name(info.state));
        let _ = writeln!(out, "CPU(s):         {}", info.nr_virt_cpu);
        let _ = writeln!(out, "CPU time:       {:.1}s", info.cpu_time as f64 / 1e9);
        let _ = writeln!(out, "Max memory:     {} KiB", info.max_mem);
        let _ = writeln!(out, "Used memory:    {} KiB", info.memory);
        Ok(out)
    }

    async fn domain_interfaces(&self, name: &str) -> Result<String> {
        let conn = self.conn.lock().await;
        let domain = Self::lookup(&conn, name)?;

        let xml = domain
            .get_xml_desc(0)
            .map_err(|e| Error::SourceUnavailable(format!("获取虚拟机XML失败: {}", e)))?;

        render_interface_list(&xml)
    }

    async fn interface_stats(&self, name: &str, iface: &str) -> Result<String> {
        let conn = self.conn.lock().await;
        let domain = Self::lookup(&conn, name)?;

        let stats = domain
            .interface_stats(iface)
            .map_err(|e| Error::SourceUnavailable(format!("无法获取网卡 {} 统计: {}", iface, e)))?;

        Ok(render_counters(
            iface,
            &[
                ("rx_bytes", stats.rx_bytes),
                ("rx_packets", stats.rx_packets),
                ("rx_errs", stats.rx_errs),
                ("rx_drop", stats.rx_drop),
                ("tx_bytes", stats.tx_bytes),
                ("tx_packets", stats.tx_packets),
                ("tx_errs", stats.tx_errs),
                ("tx_drop", stats.tx_drop),
            ],
        ))
    }

    async fn block_stats(&self, name: &str, device: &str) -> Result<String> {
        let conn = self.conn.lock().await;
        let domain = Self::lookup(&conn, name)?;

        let stats = domain
            .get_block_stats(device)
            .map_err(|e| Error::SourceUnavailable(format!("无法获取磁盘 {} 统计: {}", device, e)))?;

        Ok(render_counters(
            device,
            &[
                ("rd_req", stats.rd_req),
                ("rd_bytes", stats.rd_bytes),
                ("wr_req", stats.wr_req),
                ("wr_bytes", stats.wr_bytes),
                ("errs", stats.errs),
            ],
        ))
    }

    fn backend(&self) -> &str {
        "libvirt"
    }
}
