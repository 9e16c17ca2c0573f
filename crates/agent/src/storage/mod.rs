/// 实例磁盘
///
/// 定位实例的后端镜像文件，并通过 qemu-img 读取镜像占用

pub mod inspector;
pub mod qemu_img;

pub use inspector::{resolve_backing_file, ImageInspector};
pub use qemu_img::QemuImg;
