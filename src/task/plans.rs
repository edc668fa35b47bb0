//! 预置计划构建
//!
//! 带定位描述的操作被展开为 "Locate 计划 + 操作计划"：Locate 对应 Insight 子操作，
//! 紧随其后的操作使用其定位到的元素。

use serde_json::Value;

use crate::inference::{ActionType, LocateParam, PrimitiveAction};

/// 为单个操作构建计划；type 为 Locate 时只产出 Locate 计划
pub fn build_plans(
    action_type: ActionType,
    locate: Option<LocateParam>,
    param: Option<Value>,
) -> Vec<PrimitiveAction> {
    let mut action = PrimitiveAction::new(action_type);
    action.locate = locate;
    action.param = param;
    expand_plans(vec![action])
}

/// 在每个带 locate 的非 Locate 操作前插入 Locate 计划
pub fn expand_plans(actions: Vec<PrimitiveAction>) -> Vec<PrimitiveAction> {
    let mut plans = Vec::with_capacity(actions.len() * 2);
    for action in actions {
        if action.action_type == ActionType::Locate {
            plans.push(action);
            continue;
        }
        if let Some(locate) = &action.locate {
            plans.push(PrimitiveAction::new(ActionType::Locate).with_locate(locate.clone()));
        }
        plans.push(action);
    }
    plans
}

/// 任务标题，如 "Tap - the login button"
pub fn task_title(kind: &str, detail: &str) -> String {
    if detail.is_empty() {
        kind.to_string()
    } else {
        format!("{} - {}", kind, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_tap_plans() {
        let plans = build_plans(ActionType::Tap, Some(LocateParam::new("login")), None);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].action_type, ActionType::Locate);
        assert_eq!(plans[0].locate.as_ref().unwrap().prompt, "login");
        assert_eq!(plans[1].action_type, ActionType::Tap);
    }

    #[test]
    fn test_build_locate_only() {
        let plans = build_plans(ActionType::Locate, Some(LocateParam::new("logo")), None);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].action_type, ActionType::Locate);
    }

    #[test]
    fn test_build_without_locate() {
        let plans = build_plans(
            ActionType::KeyboardPress,
            None,
            Some(json!({"value": "Enter"})),
        );
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].param, Some(json!({"value": "Enter"})));
    }

    #[test]
    fn test_expand_mixed() {
        let plans = expand_plans(vec![
            PrimitiveAction::new(ActionType::Input)
                .with_locate(LocateParam::new("search"))
                .with_param(json!({"value": "rust"})),
            PrimitiveAction::new(ActionType::KeyboardPress).with_param(json!({"value": "Enter"})),
        ]);
        let types: Vec<_> = plans.iter().map(|p| p.action_type).collect();
        assert_eq!(
            types,
            vec![ActionType::Locate, ActionType::Input, ActionType::KeyboardPress]
        );
    }

    #[test]
    fn test_task_title() {
        assert_eq!(task_title("Tap", "login"), "Tap - login");
        assert_eq!(task_title("Scroll", ""), "Scroll");
    }
}
