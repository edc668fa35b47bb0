//! 执行记录：按分组累积每次调用的 ExecutionDump，可序列化为 JSON 并写入文件

use std::path::Path;

use serde::Serialize;

use crate::task::ExecutionDump;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedActionDump {
    pub group_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_description: Option<String>,
    pub executions: Vec<ExecutionDump>,
}

impl GroupedActionDump {
    pub fn new(group_name: impl Into<String>, group_description: Option<String>) -> Self {
        Self {
            group_name: group_name.into(),
            group_description,
            executions: Vec::new(),
        }
    }

    pub fn append(&mut self, execution: ExecutionDump) {
        self.executions.push(execution);
    }

    pub fn to_json_string(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 整体写入 JSON 文件；父目录不存在时自动创建
    pub fn write_to(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{ExecutionTask, Executor, TaskKind};

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/report.json");

        let mut dump = GroupedActionDump::new("checkout", Some("happy path".into()));
        let mut executor = Executor::new("Tap - pay");
        executor.append(ExecutionTask::new(TaskKind::Action, "Tap"));
        dump.append(executor.dump());
        dump.write_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["groupName"], "checkout");
        assert_eq!(v["groupDescription"], "happy path");
        assert_eq!(v["executions"][0]["name"], "Tap - pay");
        assert_eq!(v["executions"][0]["tasks"][0]["status"], "pending");
    }
}
