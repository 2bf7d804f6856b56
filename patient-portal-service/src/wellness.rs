use serde::Serialize;

use crate::models::Language;

/// One wellness category with its tips, already localized.
#[derive(Debug, Clone, Serialize)]
pub struct WellnessCategory {
    pub id: &'static str,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub tips: Vec<&'static str>,
}

/// The static wellness catalog for the requested language.
pub fn wellness_tips(language: Language) -> Vec<WellnessCategory> {
    match language {
        Language::En => vec![
            WellnessCategory {
                id: "nutrition",
                title: "Healthy Nutrition",
                subtitle: "Balanced diet recommendations",
                tips: vec![
                    "Eat 5 servings of fruits & vegetables daily",
                    "Drink 8-10 glasses of water",
                    "Include whole grains in meals",
                    "Limit processed foods",
                ],
            },
            WellnessCategory {
                id: "exercise",
                title: "Physical Exercise",
                subtitle: "Stay active and strong",
                tips: vec![
                    "30 minutes of moderate exercise daily",
                    "Take stairs instead of elevator",
                    "Practice yoga or stretching",
                    "Walk 10,000 steps daily",
                ],
            },
            WellnessCategory {
                id: "sleep",
                title: "Quality Sleep",
                subtitle: "Rest and recovery tips",
                tips: vec![
                    "7-9 hours of sleep nightly",
                    "Maintain consistent sleep schedule",
                    "Create a relaxing bedtime routine",
                    "Avoid screens before bed",
                ],
            },
            WellnessCategory {
                id: "mental",
                title: "Mental Wellness",
                subtitle: "Stress management techniques",
                tips: vec![
                    "Practice daily meditation",
                    "Deep breathing exercises",
                    "Connect with loved ones",
                    "Engage in hobbies you enjoy",
                ],
            },
            WellnessCategory {
                id: "heart",
                title: "Heart Health",
                subtitle: "Cardiovascular care tips",
                tips: vec![
                    "Monitor blood pressure regularly",
                    "Limit sodium intake",
                    "Include omega-3 rich foods",
                    "Avoid smoking and limit alcohol",
                ],
            },
            WellnessCategory {
                id: "natural",
                title: "Natural Remedies",
                subtitle: "Traditional wellness practices",
                tips: vec![
                    "Drink herbal teas (ginger, turmeric)",
                    "Practice oil pulling",
                    "Use neem for skin health",
                    "Include garlic in daily diet",
                ],
            },
        ],
        Language::Np => vec![
            WellnessCategory {
                id: "nutrition",
                title: "स्वस्थ पोषण",
                subtitle: "सन्तुलित आहार सिफारिसहरू",
                tips: vec![
                    "दैनिक ५ सर्भिङ फलफूल र तरकारी खानुहोस्",
                    "८-१० गिलास पानी पिउनुहोस्",
                    "खानामा साबुत अन्न समावेश गर्नुहोस्",
                    "प्रशोधित खाना सीमित गर्नुहोस्",
                ],
            },
            WellnessCategory {
                id: "exercise",
                title: "शारीरिक व्यायाम",
                subtitle: "सक्रिय र बलियो रहनुहोस्",
                tips: vec![
                    "दैनिक ३० मिनेट मध्यम व्यायाम गर्नुहोस्",
                    "लिफ्टको सट्टा सिँढी प्रयोग गर्नुहोस्",
                    "योग वा स्ट्रेचिङ अभ्यास गर्नुहोस्",
                    "दैनिक १०,००० कदम हिँड्नुहोस्",
                ],
            },
            WellnessCategory {
                id: "sleep",
                title: "गुणस्तरीय निद्रा",
                subtitle: "आराम र पुनर्प्राप्ति सुझावहरू",
                tips: vec![
                    "रातमा ७-९ घण्टा सुत्नुहोस्",
                    "निरन्तर निद्रा तालिका कायम राख्नुहोस्",
                    "आरामदायक सुत्ने दिनचर्या बनाउनुहोस्",
                    "सुत्नु अघि स्क्रिन हेर्न नछोड्नुहोस्",
                ],
            },
            WellnessCategory {
                id: "mental",
                title: "मानसिक स्वास्थ्य",
                subtitle: "तनाव व्यवस्थापन प्रविधिहरू",
                tips: vec![
                    "दैनिक ध्यान अभ्यास गर्नुहोस्",
                    "गहिरो सास फेर्ने अभ्यास गर्नुहोस्",
                    "प्रियजनहरूसँग जोडिनुहोस्",
                    "मनपर्ने शौकमा संलग्न हुनुहोस्",
                ],
            },
            WellnessCategory {
                id: "heart",
                title: "हृदय स्वास्थ्य",
                subtitle: "हृदय स्वास्थ्य देखभाल सुझावहरू",
                tips: vec![
                    "नियमित रूपमा रक्तचाप जाँच गर्नुहोस्",
                    "नुन सेवन सीमित गर्नुहोस्",
                    "ओमेगा-३ भरपूर खाना समावेश गर्नुहोस्",
                    "धुम्रपान नगर्नुहोस् र मदिरा सीमित गर्नुहोस्",
                ],
            },
            WellnessCategory {
                id: "natural",
                title: "प्राकृतिक उपचार",
                subtitle: "परम्परागत स्वास्थ्य अभ्यासहरू",
                tips: vec![
                    "जडिबुटी चिया पिउनुहोस् (अदुवा, बेसार)",
                    "तेल तान्ने अभ्यास गर्नुहोस्",
                    "छालाको स्वास्थ्यको लागि नीम प्रयोग गर्नुहोस्",
                    "दैनिक आहारमा लसुन समावेश गर्नुहोस्",
                ],
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_languages_carry_the_full_catalog() {
        let en = wellness_tips(Language::En);
        let np = wellness_tips(Language::Np);

        assert_eq!(en.len(), 6);
        assert_eq!(np.len(), 6);
        for (e, n) in en.iter().zip(np.iter()) {
            assert_eq!(e.id, n.id);
            assert_eq!(e.tips.len(), 4);
            assert_eq!(n.tips.len(), 4);
        }
    }
}
