use super::*;

#[test]
fn id_class_and_compound_selectors_match() -> Result<()> {
    let page = loaded_page()?;
    page.assert_exists("#config-form")?;
    page.assert_exists(".match-row")?;
    page.assert_exists("fieldset.match-row")?;
    page.assert_exists(r#"input.match-value[type="text"]"#)?;
    page.assert_exists("input[readonly]")?;
    Ok(())
}

#[test]
fn descendant_and_child_combinators_match() -> Result<()> {
    let page = loaded_page()?;
    page.assert_exists("#matchers .match-arg")?;
    page.assert_exists("#config-form > #matchers")?;
    assert!(matches!(
        page.assert_exists("#share > .match-arg"),
        Err(Error::SelectorNotFound(_))
    ));
    Ok(())
}

#[test]
fn unsupported_selector_forms_are_rejected() -> Result<()> {
    let page = loaded_page()?;
    for selector in [":hover", "a + b", "p ~ span", "", "div::before"] {
        match page.assert_exists(selector) {
            Err(Error::UnsupportedSelector(_)) => {}
            other => panic!("expected unsupported selector for {selector:?}, got: {other:?}"),
        }
    }
    Ok(())
}

#[test]
fn missing_elements_report_the_selector() -> Result<()> {
    let page = loaded_page()?;
    match page.assert_exists("#nope") {
        Err(Error::SelectorNotFound(selector)) => assert_eq!(selector, "#nope"),
        other => panic!("expected missing selector, got: {other:?}"),
    }
    Ok(())
}

#[test]
fn select_value_follows_the_selected_option() -> Result<()> {
    let mut page = loaded_page()?;
    assert_eq!(page.value(".match-operator")?, "inc");
    page.select_option(".match-operator", "exc")?;
    assert_eq!(page.value(".match-operator")?, "exc");
    Ok(())
}

#[test]
fn select_defaults_to_its_first_option() -> Result<()> {
    let page = Page::from_html(
        r#"
        <select id="pick">
          <option value="one">One</option>
          <option value="two">Two</option>
        </select>
        "#,
    )?;
    assert_eq!(page.value("#pick")?, "one");
    Ok(())
}

#[test]
fn unknown_option_value_leaves_the_select_unchanged() -> Result<()> {
    let mut page = loaded_page()?;
    page.select_option(".match-operator", "bogus")?;
    assert_eq!(page.value(".match-operator")?, "inc");
    Ok(())
}

#[test]
fn character_references_are_decoded() -> Result<()> {
    let page = Page::from_html(r#"<p id="msg">a &amp; b &#64; c</p>"#)?;
    page.assert_text("#msg", "a & b @ c")?;
    Ok(())
}

#[test]
fn checkbox_click_toggles_and_reports_state() -> Result<()> {
    let mut page = loaded_page()?;
    page.click("#merge")?;
    page.assert_checked("#merge", true)?;
    page.click("#merge")?;
    page.assert_checked("#merge", false)?;
    Ok(())
}

#[test]
fn typing_into_a_checkbox_is_a_type_mismatch() -> Result<()> {
    let mut page = loaded_page()?;
    match page.type_text("#merge", "oops") {
        Err(Error::TypeMismatch { expected, .. }) => {
            assert_eq!(expected, "text entry control");
        }
        other => panic!("expected type mismatch, got: {other:?}"),
    }
    Ok(())
}

#[test]
fn disabled_controls_ignore_input() -> Result<()> {
    let mut page = Page::from_html(r#"<input id="frozen" type="text" disabled>"#)?;
    page.type_text("#frozen", "nope")?;
    page.assert_value("#frozen", "")?;
    Ok(())
}

#[test]
fn typed_text_is_nfc_normalized() -> Result<()> {
    let mut page = loaded_page()?;
    page.type_text(".match-value", "caf\u{0065}\u{0301}")?;
    page.assert_value(".match-value", "caf\u{00e9}")?;
    Ok(())
}

#[test]
fn mismatched_and_unclosed_tags_are_parse_errors() {
    match Page::from_html("<div><p>text</div>") {
        Err(Error::HtmlParse(message)) => {
            assert!(message.contains("mismatched closing tag"), "unexpected: {message}");
        }
        other => panic!("expected parse error, got: {other:?}"),
    }
    match Page::from_html("<div>text") {
        Err(Error::HtmlParse(message)) => {
            assert!(message.contains("unclosed element"), "unexpected: {message}");
        }
        other => panic!("expected parse error, got: {other:?}"),
    }
}

#[test]
fn comments_and_doctype_are_skipped() -> Result<()> {
    let page = Page::from_html(
        r#"<!DOCTYPE html><!-- header --><p id="msg">kept</p><!-- trailer -->"#,
    )?;
    page.assert_text("#msg", "kept")?;
    Ok(())
}

#[test]
fn style_content_is_raw_text() -> Result<()> {
    let page = Page::from_html(r#"<style>p > a { color: red }</style><p id="msg">x</p>"#)?;
    assert!(page.text("style")?.contains("p > a"));
    Ok(())
}
