use form_enhancer::Page;
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};

const ENHANCER_PROPTEST_REGRESSION_FILE: &str =
    "tests/proptest-regressions/enhancer_property_fuzz_test.txt";
const DEFAULT_ENHANCER_PROPTEST_CASES: u32 = 128;

const FUZZ_FORM_HTML: &str = r#"
    <form id="config-form" action="/calendar" method="get">
      <input id="user-tz" name="user-tz" type="hidden">
      <input id="merge" name="mrg" type="checkbox" class="auto-submit" data-delay-ms="0">
      <div id="matchers">
        <fieldset class="match-row">
          <select class="match-property"><option value="SUMMARY" selected>Summary</option></select>
          <select class="match-operator">
            <option value="inc" selected>include</option>
            <option value="exc">exclude</option>
          </select>
          <input class="match-value" type="text">
          <input class="match-arg" type="hidden">
        </fieldset>
      </div>
      <input id="submit-trigger" type="hidden">
    </form>
    "#;

const DEBOUNCE_MS: i64 = 1000;

#[derive(Clone, Debug)]
enum UiAction {
    EditValue(String),
    ToggleMerge,
    Advance(i64),
    Reload,
}

fn enhancer_proptest_cases() -> u32 {
    std::env::var("FORM_ENHANCER_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_ENHANCER_PROPTEST_CASES)
}

fn value_strategy() -> BoxedStrategy<String> {
    vec(
        prop_oneof![
            Just('a'),
            Just('b'),
            Just('c'),
            Just('x'),
            Just('y'),
            Just('z'),
            Just('0'),
            Just('1'),
            Just('='),
            Just('.'),
            Just('*'),
            Just(' '),
        ],
        0..=10,
    )
    .prop_map(|chars| chars.into_iter().collect())
    .boxed()
}

fn ui_action_strategy() -> BoxedStrategy<UiAction> {
    prop_oneof![
        5 => value_strategy().prop_map(UiAction::EditValue),
        2 => Just(UiAction::ToggleMerge),
        4 => (0i64..=1500).prop_map(UiAction::Advance),
        1 => Just(UiAction::Reload),
    ]
    .boxed()
}

fn ui_action_sequence_strategy() -> BoxedStrategy<Vec<UiAction>> {
    vec(ui_action_strategy(), 1..=32).boxed()
}

// Reference model of the wiring: the current row value, the per-field
// pending deadlines, the virtual clock, and the number of fires so far.
#[derive(Debug, Default)]
struct WiringModel {
    now: i64,
    value: String,
    row_due: Option<i64>,
    merge_due: Option<i64>,
    fires: usize,
}

impl WiringModel {
    fn edit(&mut self, value: &str) {
        self.value = value.to_string();
        self.row_due = Some(self.now + DEBOUNCE_MS);
    }

    fn toggle_merge(&mut self) {
        self.merge_due = Some(self.now);
    }

    fn advance(&mut self, delta: i64) {
        self.now += delta;
        if self.row_due.map(|due| due <= self.now).unwrap_or(false) {
            self.row_due = None;
            self.fires += 1;
        }
        if self.merge_due.map(|due| due <= self.now).unwrap_or(false) {
            self.merge_due = None;
            self.fires += 1;
        }
    }

    fn flush(&mut self) {
        self.fires += usize::from(self.row_due.take().is_some());
        self.fires += usize::from(self.merge_due.take().is_some());
    }
}

fn fail(message: String) -> TestCaseError {
    TestCaseError::fail(message)
}

fn check_arg_invariant(page: &Page, model: &WiringModel) -> TestCaseResult {
    let name = page
        .attr(".match-arg", "name")
        .map_err(|err| fail(format!("{err:?}")))?;
    let value = page
        .value(".match-arg")
        .map_err(|err| fail(format!("{err:?}")))?;

    if model.value.is_empty() {
        prop_assert_eq!(name, None, "empty value must leave the arg unnamed");
        prop_assert_eq!(value, "", "empty value must leave the arg empty");
    } else {
        prop_assert_eq!(name.as_deref(), Some("inc"));
        prop_assert_eq!(value, format!("SUMMARY={}", model.value));
    }
    Ok(())
}

fn run_wiring_sequence(actions: &[UiAction]) -> TestCaseResult {
    let mut page = Page::parse(FUZZ_FORM_HTML).map_err(|err| fail(format!("{err:?}")))?;
    page.set_timezone("Europe/Berlin")
        .map_err(|err| fail(format!("{err:?}")))?;
    page.load().map_err(|err| fail(format!("{err:?}")))?;
    let mut model = WiringModel::default();

    for (step, action) in actions.iter().enumerate() {
        let outcome = match action {
            UiAction::EditValue(value) => {
                model.edit(value);
                page.type_text(".match-value", value)
            }
            UiAction::ToggleMerge => {
                model.toggle_merge();
                page.click("#merge")
            }
            UiAction::Advance(delta) => {
                model.advance(*delta);
                page.advance_time(*delta)
            }
            UiAction::Reload => page.load(),
        };
        if let Err(error) = outcome {
            prop_assert!(
                false,
                "action failed at step {step}: {action:?}, error={error:?}, actions={actions:?}"
            );
        }

        check_arg_invariant(&page, &model)?;
        prop_assert_eq!(
            page.refresh_requests().len(),
            model.fires,
            "fire count diverged at step {}: {:?}, actions={:?}",
            step,
            action,
            actions
        );
        let row_listeners = page
            .listener_count(".match-row", "input")
            .map_err(|err| fail(format!("{err:?}")))?;
        prop_assert_eq!(row_listeners, 1, "row listener count diverged");
    }

    page.flush().map_err(|err| fail(format!("{err:?}")))?;
    model.flush();
    prop_assert_eq!(
        page.refresh_requests().len(),
        model.fires,
        "fire count diverged after flush, actions={:?}",
        actions
    );
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: enhancer_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(ENHANCER_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn wiring_matches_the_reference_model(actions in ui_action_sequence_strategy()) {
        run_wiring_sequence(&actions)?;
    }
}
